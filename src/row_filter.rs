use std::str::FromStr;

use regex::Regex;

use crate::error::ActionError;
use crate::model::Row;

pub const EMPTY_PATTERN: &str = r"^\s*$";
pub const LETTERS_PATTERN: &str = r"^[A-Za-z\s]+$";
pub const NUMBERS_PATTERN: &str = r"^[\d\s.,]+$";
pub const SYMBOLS_PATTERN: &str = r"^[^\w\s]+$";

/// Which rows to delete, judged by the row's first cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    Empty,
    Letters,
    Numbers,
    Symbols,
    Word {
        word: String,
        exact: bool,
        whole_word: bool,
        case_insensitive: bool,
    },
    Digits {
        count: usize,
        exact: bool,
    },
    /// Plain text matched literally anywhere in the cell.
    Text(String),
    Regex(String),
}

impl RowFilter {
    #[must_use]
    pub fn pattern(&self) -> String {
        match self {
            Self::Empty => EMPTY_PATTERN.to_string(),
            Self::Letters => LETTERS_PATTERN.to_string(),
            Self::Numbers => NUMBERS_PATTERN.to_string(),
            Self::Symbols => SYMBOLS_PATTERN.to_string(),
            Self::Word {
                word,
                exact,
                whole_word,
                case_insensitive,
            } => word_pattern(word, *exact, *whole_word, *case_insensitive),
            Self::Digits { count, exact } => digits_pattern(*count, *exact),
            Self::Text(text) => regex::escape(text.trim()),
            Self::Regex(pattern) => pattern.trim().to_string(),
        }
    }
}

impl FromStr for RowFilter {
    type Err = String;

    /// Named patterns (`Empty`, `Letters`, `Numbers`, `Symbols`, any case);
    /// anything else is taken as a regular expression.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err("row filter cannot be empty".to_string());
        }
        let filter = match spec.to_ascii_lowercase().as_str() {
            "empty" => Self::Empty,
            "letters" => Self::Letters,
            "numbers" => Self::Numbers,
            "symbols" => Self::Symbols,
            _ => Self::Regex(spec.to_string()),
        };
        Ok(filter)
    }
}

fn word_pattern(word: &str, exact: bool, whole_word: bool, case_insensitive: bool) -> String {
    let word = regex::escape(word.trim());
    if word.is_empty() {
        return EMPTY_PATTERN.to_string();
    }
    let flags = if case_insensitive { "(?i)" } else { "" };
    if exact {
        format!(r"{flags}^\s*{word}\s*$")
    } else if whole_word {
        format!(r"{flags}\b{word}\b")
    } else {
        format!("{flags}{word}")
    }
}

fn digits_pattern(count: usize, exact: bool) -> String {
    let count = count.max(1);
    if exact {
        format!(r"^\s*\d{{{count}}}\s*$")
    } else {
        format!(r"(?:^|\D)\d{{{count}}}(?:\D|$)")
    }
}

/// # Errors
///
/// Returns [`ActionError::InvalidPattern`] when the expression does not
/// compile.
pub fn compile_pattern(pattern: &str) -> Result<Regex, ActionError> {
    Regex::new(pattern).map_err(|error| ActionError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: error.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPartition {
    pub kept: Vec<Row>,
    /// Original index and first cell of every deleted row.
    pub matched: Vec<(usize, String)>,
    /// New position of the protected row, if it was given.
    pub protected_at: Option<usize>,
}

/// Splits rows into kept and deleted by testing the first cell. A row with no
/// cells is tested as an empty string. The protected row is always kept.
pub(crate) fn partition_rows(
    rows: &[Row],
    pattern: &Regex,
    protected: Option<usize>,
) -> RowPartition {
    let mut partition = RowPartition::default();
    for (index, row) in rows.iter().enumerate() {
        if Some(index) == protected {
            partition.protected_at = Some(partition.kept.len());
            partition.kept.push(row.clone());
            continue;
        }
        let first_cell = row.first().map_or("", String::as_str);
        if pattern.is_match(first_cell) {
            partition.matched.push((index, first_cell.to_string()));
        } else {
            partition.kept.push(row.clone());
        }
    }
    partition
}
