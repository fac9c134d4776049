use std::collections::BTreeSet;
use std::str::FromStr;

use crate::net_value::NetColumn;
use crate::tokenizer::TokenizerOptions;

pub const DEFAULT_DROPPED_COLUMN: &str = "Location";
pub const DEFAULT_TEXT_COLUMN: &str = "Edition #";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().copied()
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                pages.extend(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                pages.insert(page);
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

/// Knobs for one extraction pass over an invoice document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Zero-based index of the header line among the split rows of the first
    /// usable table.
    pub header_row_index: usize,
    /// Header columns removed from the schema (case-insensitive).
    pub dropped_columns: Vec<String>,
    /// Columns written as `"value"` so spreadsheets keep them as text.
    pub text_columns: Vec<String>,
    pub delimiter: u8,
    pub net: Option<NetColumn>,
    pub strip_location_codes: bool,
    pub tokenizer: TokenizerOptions,
    pub pages: Option<PageSelection>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            header_row_index: 0,
            dropped_columns: vec![DEFAULT_DROPPED_COLUMN.to_string()],
            text_columns: vec![DEFAULT_TEXT_COLUMN.to_string()],
            delimiter: b',',
            net: None,
            strip_location_codes: true,
            tokenizer: TokenizerOptions::default(),
            pages: None,
        }
    }
}

/// Parses a `price,discount` pair of zero-based column indexes.
///
/// # Errors
///
/// Returns a message when the pair is not two non-negative integers.
pub fn parse_net_columns(spec: &str) -> Result<NetColumn, String> {
    let (price, discount) = spec
        .split_once(',')
        .ok_or_else(|| format!("invalid net columns '{spec}', expected price,discount"))?;
    let price: usize = price
        .trim()
        .parse()
        .map_err(|_| format!("invalid price column: '{price}'"))?;
    let discount: usize = discount
        .trim()
        .parse()
        .map_err(|_| format!("invalid discount column: '{discount}'"))?;
    Ok(NetColumn::new(price, discount))
}
