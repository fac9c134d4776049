use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::actions::{Action, ActionLog, ActionStep};
use crate::error::{ActionError, ExtractError};
use crate::warning::{ExtractWarning, WarningCode};
use crate::worksheet::Worksheet;

pub const TEMPLATE_VERSION: &str = "K";
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";
const FALLBACK_FILE_STEM: &str = "template";

/// A saved, replayable sequence of worksheet actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub version: String,
    pub created_at: String,
    pub actions: Vec<ActionStep>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Template {
    /// Steps are kept verbatim. Unknown types and missing or unusable
    /// parameters are noted in `warnings` so the user sees them at save time.
    #[must_use]
    pub fn from_steps(name: impl Into<String>, actions: Vec<ActionStep>) -> Self {
        let warnings = actions
            .iter()
            .filter_map(|step| Action::from_step(step).err())
            .map(|error| match error {
                ActionError::UnknownAction(kind) => {
                    format!("Unknown action type in build: {kind}")
                }
                other => capitalize(&other.to_string()),
            })
            .collect();

        Self {
            name: name.into(),
            version: TEMPLATE_VERSION.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            actions,
            warnings,
        }
    }

    #[must_use]
    pub fn from_log(name: impl Into<String>, log: &ActionLog) -> Self {
        Self::from_steps(name, log.actions().map(Action::to_step).collect())
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", sanitize_filename(&self.name))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Replaces runs of characters outside `[A-Za-z0-9._-]` with `_` and trims
/// leading and trailing underscores.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_run = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            sanitized.push(ch);
            in_run = false;
        } else if !in_run {
            sanitized.push('_');
            in_run = true;
        }
    }

    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_FILE_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub sheet: Worksheet,
    pub warnings: Vec<ExtractWarning>,
    /// Rows deleted across all `delete_unwanted_rows` steps.
    pub matched: Vec<(usize, String)>,
}

fn warning_for(error: &ActionError) -> ExtractWarning {
    let code = match error {
        ActionError::MissingParameter { .. } => WarningCode::MissingParameter,
        ActionError::UnknownAction(_) => WarningCode::UnknownAction,
        ActionError::InvalidParameter { .. } | ActionError::InvalidPattern { .. } => {
            WarningCode::InvalidParameter
        }
    };
    ExtractWarning::new(code, format!("skipped: {error}"))
}

/// Replays `template` on top of `start`. Steps that cannot run are skipped
/// and reported; the remaining steps still apply. When `log` is given every
/// applied step is recorded so it can be undone individually.
pub fn replay(
    template: &Template,
    start: &Worksheet,
    mut log: Option<&mut ActionLog>,
) -> ReplayOutcome {
    let mut outcome = ReplayOutcome {
        sheet: start.clone(),
        ..ReplayOutcome::default()
    };

    for (index, step) in template.actions.iter().enumerate() {
        let result = Action::from_step(step).and_then(|action| match log.as_deref_mut() {
            Some(log) => log.run(&outcome.sheet, action),
            None => action.apply(&outcome.sheet),
        });

        match result {
            Ok(applied) => {
                outcome.sheet = applied.sheet;
                outcome.matched.extend(applied.matched);
            }
            Err(error) => {
                warn!(
                    template = %template.name,
                    step = index + 1,
                    error = %error,
                    "template step skipped"
                );
                outcome.warnings.push(warning_for(&error).with_step(index));
            }
        }
    }

    outcome
}

/// Flat directory of `<name>.json` template files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES_DIR)
    }
}

impl TemplateStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the template as pretty JSON and returns its path. An existing
    /// file with the same sanitized name is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, template: &Template) -> Result<PathBuf, ExtractError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(template.file_name());
        let body = serde_json::to_string_pretty(template)?;
        fs::write(&path, body)?;
        info!(path = %path.display(), steps = template.actions.len(), "saved template");
        Ok(path)
    }

    /// File names of all stored templates, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or read.
    pub fn list(&self) -> Result<Vec<String>, ExtractError> {
        fs::create_dir_all(&self.dir)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") && entry.file_type()?.is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// # Errors
    ///
    /// Returns [`ExtractError::TemplateRead`] if the file cannot be read and
    /// [`ExtractError::Json`] if it is not a template.
    pub fn load(&self, file_name: &str) -> Result<Template, ExtractError> {
        let path = self.dir.join(file_name);
        let body = fs::read_to_string(&path).map_err(|source| ExtractError::TemplateRead {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&body)?)
    }
}
