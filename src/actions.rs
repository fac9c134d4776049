use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ActionError;
use crate::net_value::NetColumn;
use crate::row_filter::compile_pattern;
use crate::worksheet::Worksheet;

const APPLY_HEADERS: &str = "apply_headers";
const REMOVE_DUPLICATES: &str = "remove_duplicates";
const FIX_CONCATENATED: &str = "fix_concatenated";
const DELETE_UNWANTED_ROWS: &str = "delete_unwanted_rows";
const ADD_NET_ITEM_COL: &str = "add_net_item_col";

const HEADER_ROW_INDEX: &str = "header_row_index";
const PATTERN: &str = "pattern";
const RETAIL_PRICE_INDEX: &str = "retail_price_index";
const DISCOUNT_PERCENT_INDEX: &str = "discount_percent_index";

/// Persisted form of an action: `{"type": ..., "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ApplyHeaders {
        header_row_index: usize,
    },
    RemoveDuplicates {
        header_row_index: usize,
    },
    FixConcatenated,
    DeleteUnwantedRows {
        pattern: String,
    },
    AddNetItemCol {
        retail_price_index: usize,
        discount_percent_index: usize,
    },
}

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub sheet: Worksheet,
    /// Rows removed by `delete_unwanted_rows`: original index and first cell.
    pub matched: Vec<(usize, String)>,
}

fn required<'a>(
    params: &'a Map<String, Value>,
    action: &'static str,
    parameter: &'static str,
) -> Result<&'a Value, ActionError> {
    match params.get(parameter) {
        None | Some(Value::Null) => Err(ActionError::MissingParameter { action, parameter }),
        Some(value) => Ok(value),
    }
}

fn required_index(
    params: &Map<String, Value>,
    action: &'static str,
    parameter: &'static str,
) -> Result<usize, ActionError> {
    let value = required(params, action, parameter)?;
    value
        .as_u64()
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| ActionError::InvalidParameter {
            action,
            parameter,
            reason: format!("expected a non-negative integer, got {value}"),
        })
}

impl Action {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApplyHeaders { .. } => APPLY_HEADERS,
            Self::RemoveDuplicates { .. } => REMOVE_DUPLICATES,
            Self::FixConcatenated => FIX_CONCATENATED,
            Self::DeleteUnwantedRows { .. } => DELETE_UNWANTED_ROWS,
            Self::AddNetItemCol { .. } => ADD_NET_ITEM_COL,
        }
    }

    /// Human-readable label; column numbers are shown 1-based.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::ApplyHeaders { header_row_index } => {
                format!("Headers from row {header_row_index}")
            }
            Self::RemoveDuplicates { .. } => "Remove Duplicate Header Rows".to_string(),
            Self::FixConcatenated => "Fix Concatenated Rows".to_string(),
            Self::DeleteUnwantedRows { pattern } => format!("Delete Rows: {pattern}"),
            Self::AddNetItemCol {
                retail_price_index,
                discount_percent_index,
            } => format!(
                "Add Item Net Column (price col {}, discount col {})",
                retail_price_index + 1,
                discount_percent_index + 1
            ),
        }
    }

    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] for an unrecognised type and
    /// [`ActionError::MissingParameter`] / [`ActionError::InvalidParameter`]
    /// when a required parameter is absent or has the wrong shape.
    pub fn from_step(step: &ActionStep) -> Result<Self, ActionError> {
        let params = &step.params;
        match step.kind.as_str() {
            APPLY_HEADERS => Ok(Self::ApplyHeaders {
                header_row_index: required_index(params, APPLY_HEADERS, HEADER_ROW_INDEX)?,
            }),
            REMOVE_DUPLICATES => Ok(Self::RemoveDuplicates {
                header_row_index: required_index(params, REMOVE_DUPLICATES, HEADER_ROW_INDEX)?,
            }),
            FIX_CONCATENATED => Ok(Self::FixConcatenated),
            DELETE_UNWANTED_ROWS => {
                let value = required(params, DELETE_UNWANTED_ROWS, PATTERN)?;
                let pattern = value.as_str().map(str::trim).unwrap_or_default();
                if pattern.is_empty() {
                    return Err(ActionError::MissingParameter {
                        action: DELETE_UNWANTED_ROWS,
                        parameter: PATTERN,
                    });
                }
                Ok(Self::DeleteUnwantedRows {
                    pattern: pattern.to_string(),
                })
            }
            ADD_NET_ITEM_COL => Ok(Self::AddNetItemCol {
                retail_price_index: required_index(params, ADD_NET_ITEM_COL, RETAIL_PRICE_INDEX)?,
                discount_percent_index: required_index(
                    params,
                    ADD_NET_ITEM_COL,
                    DISCOUNT_PERCENT_INDEX,
                )?,
            }),
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }

    #[must_use]
    pub fn to_step(&self) -> ActionStep {
        let mut params = Map::new();
        match self {
            Self::ApplyHeaders { header_row_index }
            | Self::RemoveDuplicates { header_row_index } => {
                params.insert(HEADER_ROW_INDEX.to_string(), Value::from(*header_row_index));
            }
            Self::FixConcatenated => {}
            Self::DeleteUnwantedRows { pattern } => {
                params.insert(PATTERN.to_string(), Value::from(pattern.as_str()));
            }
            Self::AddNetItemCol {
                retail_price_index,
                discount_percent_index,
            } => {
                params.insert(
                    RETAIL_PRICE_INDEX.to_string(),
                    Value::from(*retail_price_index),
                );
                params.insert(
                    DISCOUNT_PERCENT_INDEX.to_string(),
                    Value::from(*discount_percent_index),
                );
            }
        }
        ActionStep {
            kind: self.kind().to_string(),
            params,
        }
    }

    /// Applies the action to a copy of `sheet`; the input is never modified.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] when a parameter cannot be used with this
    /// sheet (header row out of range, pattern that does not compile).
    pub fn apply(&self, sheet: &Worksheet) -> Result<Applied, ActionError> {
        let (sheet, matched) = match self {
            Self::ApplyHeaders { header_row_index } => {
                if *header_row_index >= sheet.rows().len() {
                    return Err(ActionError::InvalidParameter {
                        action: APPLY_HEADERS,
                        parameter: HEADER_ROW_INDEX,
                        reason: format!(
                            "row {header_row_index} does not exist ({} rows)",
                            sheet.rows().len()
                        ),
                    });
                }
                (sheet.with_header_row(*header_row_index), Vec::new())
            }
            Self::RemoveDuplicates { header_row_index } => {
                (sheet.without_duplicate_headers(*header_row_index), Vec::new())
            }
            Self::FixConcatenated => (sheet.split_concatenated(), Vec::new()),
            Self::DeleteUnwantedRows { pattern } => {
                let pattern = compile_pattern(pattern)?;
                sheet.without_rows_matching(&pattern)
            }
            Self::AddNetItemCol {
                retail_price_index,
                discount_percent_index,
            } => {
                let net = NetColumn::new(*retail_price_index, *discount_percent_index);
                (sheet.with_net_column(&net), Vec::new())
            }
        };

        debug!(
            action = self.kind(),
            rows = sheet.rows().len(),
            matched = matched.len(),
            "applied action"
        );
        Ok(Applied { sheet, matched })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedAction {
    pub id: u64,
    pub action: Action,
    pub label: String,
    pub applied_at: DateTime<Utc>,
    /// Worksheet as it was before the action ran.
    pub before: Worksheet,
}

/// Linear undo/redo history owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLog {
    applied: Vec<LoggedAction>,
    redo: Vec<LoggedAction>,
    next_id: u64,
}

impl ActionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn applied(&self) -> &[LoggedAction] {
        &self.applied
    }

    #[must_use]
    pub fn redo_stack(&self) -> &[LoggedAction] {
        &self.redo
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.applied.iter().map(|entry| &entry.action)
    }

    /// Appends an entry and invalidates the redo stack.
    pub fn record(&mut self, action: Action, before: Worksheet) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.applied.push(LoggedAction {
            id,
            label: action.label(),
            action,
            applied_at: Utc::now(),
            before,
        });
        self.redo.clear();
        id
    }

    /// Applies `action` to `sheet` and logs it. Nothing is logged when the
    /// action fails.
    ///
    /// # Errors
    ///
    /// Propagates the [`ActionError`] from [`Action::apply`].
    pub fn run(&mut self, sheet: &Worksheet, action: Action) -> Result<Applied, ActionError> {
        let applied = action.apply(sheet).inspect_err(|error| {
            warn!(action = action.kind(), error = %error, "action not applied");
        })?;
        self.record(action, sheet.clone());
        Ok(applied)
    }

    /// Reverts the last action, returning the worksheet it started from.
    pub fn undo(&mut self) -> Option<Worksheet> {
        let entry = self.applied.pop()?;
        let before = entry.before.clone();
        self.redo.push(entry);
        Some(before)
    }

    /// Reverts the action with `id` and everything after it. The target ends
    /// on top of the redo stack.
    pub fn undo_to(&mut self, id: u64) -> Option<Worksheet> {
        let position = self.applied.iter().position(|entry| entry.id == id)?;
        let removed = self.applied.split_off(position);
        let before = removed.first().map(|entry| entry.before.clone());
        self.redo.extend(removed.into_iter().rev());
        before
    }

    /// Re-applies the most recently undone action on top of `current`.
    ///
    /// Returns `None` when there is nothing to redo.
    pub fn redo(&mut self, current: &Worksheet) -> Option<Result<Applied, ActionError>> {
        let entry = self.redo.pop()?;
        let result = entry.action.apply(current);
        match &result {
            Ok(_) => self.applied.push(LoggedAction {
                applied_at: Utc::now(),
                before: current.clone(),
                ..entry
            }),
            Err(_) => self.redo.push(entry),
        }
        Some(result)
    }

    /// Forgets all history and returns the worksheet the first logged action
    /// started from.
    pub fn reset(&mut self) -> Option<Worksheet> {
        let original = self.applied.first().map(|entry| entry.before.clone());
        self.applied.clear();
        self.redo.clear();
        original
    }
}
