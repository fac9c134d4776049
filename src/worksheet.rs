use regex::Regex;
use serde::Serialize;

use crate::cell_split::split_concatenated_rows;
use crate::header::{clean_duplicate_headers, fit_headers_to_width};
use crate::model::{InvoiceDocument, Row};
use crate::net_value::NetColumn;
use crate::row_filter::partition_rows;

/// Rows being cleaned, plus which of them (if any) holds the column names.
/// The header row stays in place and is hidden by [`Worksheet::display`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Worksheet {
    rows: Vec<Row>,
    header_row_index: Option<usize>,
}

/// What a spreadsheet or CSV writer sees: named columns and equal-width rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Worksheet {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            header_row_index: None,
        }
    }

    /// Every table of every page, concatenated in reading order.
    #[must_use]
    pub fn from_document(document: &InvoiceDocument) -> Self {
        let rows = document
            .pages
            .iter()
            .flat_map(|page| page.tables.iter().flatten().cloned())
            .collect();
        Self::new(rows)
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn header_row_index(&self) -> Option<usize> {
        self.header_row_index
    }

    #[must_use]
    pub fn header_row(&self) -> Option<&Row> {
        self.header_row_index.and_then(|index| self.rows.get(index))
    }

    fn is_header_copy(&self, index: usize, row: &Row) -> bool {
        Some(index) == self.header_row_index || self.header_row() == Some(row)
    }

    /// Rows shown to the user: everything except the header row and exact
    /// copies of it.
    #[must_use]
    pub fn data_rows(&self) -> Vec<&Row> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(index, row)| !self.is_header_copy(*index, row))
            .map(|(_, row)| row)
            .collect()
    }

    #[must_use]
    pub fn display(&self) -> DisplayTable {
        let data = self.data_rows();
        let width = data.iter().map(|row| row.len()).max().unwrap_or_else(|| {
            self.header_row().map_or(0, Vec::len)
        });
        let headers = match self.header_row() {
            Some(header) => fit_headers_to_width(clean_duplicate_headers(header), width),
            None => fit_headers_to_width(Vec::new(), width),
        };
        let rows = data
            .into_iter()
            .map(|row| {
                let mut row = row.clone();
                row.resize(width, String::new());
                row
            })
            .collect();
        DisplayTable { headers, rows }
    }

    pub(crate) fn with_header_row(&self, index: usize) -> Self {
        Self {
            rows: self.rows.clone(),
            header_row_index: Some(index),
        }
    }

    /// Drops rows identical to the row at `index`, keeping that row itself.
    pub(crate) fn without_duplicate_headers(&self, index: usize) -> Self {
        let Some(header) = self.rows.get(index) else {
            return self.clone();
        };

        let mut rows = Vec::with_capacity(self.rows.len());
        let mut kept_at = None;
        let mut header_at = None;
        for (position, row) in self.rows.iter().enumerate() {
            if position != index && row == header {
                continue;
            }
            if position == index {
                kept_at = Some(rows.len());
            }
            if Some(position) == self.header_row_index {
                header_at = Some(rows.len());
            }
            rows.push(row.clone());
        }

        // A removed header row was a copy; the kept one takes its place.
        Self {
            rows,
            header_row_index: self.header_row_index.and(header_at.or(kept_at)),
        }
    }

    pub(crate) fn split_concatenated(&self) -> Self {
        let (rows, header_row_index) = split_concatenated_rows(&self.rows, self.header_row_index);
        Self {
            rows,
            header_row_index,
        }
    }

    pub(crate) fn without_rows_matching(&self, pattern: &Regex) -> (Self, Vec<(usize, String)>) {
        let partition = partition_rows(&self.rows, pattern, self.header_row_index);
        (
            Self {
                rows: partition.kept,
                header_row_index: partition.protected_at,
            },
            partition.matched,
        )
    }

    /// The header row receives the column name; every other row its value.
    pub(crate) fn with_net_column(&self, net: &NetColumn) -> Self {
        let mut rows = self.rows.clone();
        for (index, row) in rows.iter_mut().enumerate() {
            let value = if Some(index) == self.header_row_index {
                net.header.clone()
            } else {
                net.value_for(row)
            };
            net.insert_into(row, value);
        }
        Self {
            rows,
            header_row_index: self.header_row_index,
        }
    }
}
