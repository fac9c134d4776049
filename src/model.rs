use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};

pub type Row = Vec<String>;

/// Output of the PDF table-extraction collaborator: pages of tables of rows
/// of cell strings. Cells may hold several invoice lines joined by `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub pages: Vec<PageTables>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTables {
    pub page_number: u32,
    #[serde(default, deserialize_with = "tables_with_blank_cells")]
    pub tables: Vec<Vec<Row>>,
}

/// Table extractors emit `null` for cells they could not read; those become
/// empty strings.
fn tables_with_blank_cells<'de, D>(deserializer: D) -> Result<Vec<Vec<Row>>, D::Error>
where
    D: Deserializer<'de>,
{
    let tables = Vec::<Vec<Vec<Option<String>>>>::deserialize(deserializer)?;
    Ok(tables
        .into_iter()
        .map(|table| {
            table
                .into_iter()
                .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
                .collect()
        })
        .collect())
}

impl InvoiceDocument {
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|page| page.tables.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscardReason {
    NoRemainder,
    NoNumericContent,
    EmptyTitle,
    RepeatedHeader,
    EmptyRow,
}

impl Display for DiscardReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRemainder => f.write_str("nothing follows the edition token"),
            Self::NoNumericContent => f.write_str("no quantity, price or percent tokens"),
            Self::EmptyTitle => f.write_str("no title text before the quantities"),
            Self::RepeatedHeader => f.write_str("repeated header row"),
            Self::EmptyRow => f.write_str("empty first cell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscardedRow {
    pub page: u32,
    pub text: String,
    #[serde(flatten)]
    pub reason: DiscardReason,
}

/// Named columns plus rows that are each exactly `headers.len()` wide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceTable {
    pub headers: Vec<String>,
    pub records: Vec<Row>,
    pub discarded: Vec<DiscardedRow>,
}
