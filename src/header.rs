use std::collections::{HashMap, HashSet};

use crate::model::Row;

pub(crate) const UNNAMED_HEADER: &str = "Unnamed";

/// Whitespace-splits a header line without splitting before a `#`, so that
/// `Edition #` stays one column name.
pub(crate) fn split_header_text(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        match names.last_mut() {
            Some(previous) if token.starts_with('#') => {
                previous.push(' ');
                previous.push_str(token);
            }
            _ => names.push(token.to_string()),
        }
    }
    names
}

/// Blank names become `Unnamed`; repeats get `_1`, `_2`, ... suffixes.
pub(crate) fn clean_duplicate_headers<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    let mut repeats: HashMap<&str, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut cleaned = Vec::with_capacity(headers.len());

    for header in headers {
        let header = header.as_ref().trim();
        let header = if header.is_empty() {
            UNNAMED_HEADER
        } else {
            header
        };

        let mut name = header.to_string();
        while used.contains(&name) {
            let count = repeats.entry(header).or_insert(0);
            *count += 1;
            name = format!("{header}_{count}");
        }
        used.insert(name.clone());
        cleaned.push(name);
    }

    cleaned
}

/// Ordered, unique column names every record is reconciled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    names: Vec<String>,
}

impl ColumnSchema {
    /// Builds the schema from a header row's raw text, dropping the columns in
    /// `dropped` (compared case-insensitively).
    #[must_use]
    pub fn from_header_text(text: &str, dropped: &[String]) -> Self {
        let tokens = split_header_text(text)
            .into_iter()
            .filter(|name| {
                !dropped
                    .iter()
                    .any(|drop| drop.trim().eq_ignore_ascii_case(name))
            })
            .collect::<Vec<_>>();
        Self {
            names: clean_duplicate_headers(&tokens),
        }
    }

    #[must_use]
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: clean_duplicate_headers(names),
        }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    /// Pads with empty fields or truncates trailing ones so the record is
    /// exactly schema width.
    #[must_use]
    pub fn reconcile(&self, fields: &[String]) -> Row {
        let mut record = fields.iter().take(self.width()).cloned().collect::<Vec<_>>();
        record.resize(self.width(), String::new());
        record
    }

    #[must_use]
    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// Pads display headers with `col_{n}` placeholders (or truncates them) to
/// match the widest row.
pub(crate) fn fit_headers_to_width(mut headers: Vec<String>, width: usize) -> Vec<String> {
    while headers.len() < width {
        headers.push(format!("col_{}", headers.len()));
    }
    headers.truncate(width);
    headers
}
