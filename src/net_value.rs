use crate::header::fit_headers_to_width;
use crate::model::Row;

pub const DEFAULT_NET_HEADER: &str = "Item Net";

/// Lenient numeric coercion for invoice cells: strips `$ £ €`, thousands
/// separators and `%`, reads `(123.45)` as `-123.45`, and falls back to
/// `0.0` for anything unparseable.
#[must_use]
pub fn to_float(value: &str) -> f64 {
    let mut text = value.trim();
    if text.is_empty() {
        return 0.0;
    }

    let negative = text.len() >= 2 && text.starts_with('(') && text.ends_with(')');
    if negative {
        text = text[1..text.len() - 1].trim();
    }

    let cleaned = text
        .chars()
        .filter(|ch| !matches!(ch, '$' | '£' | '€' | ',' | '%'))
        .collect::<String>();
    match cleaned.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => {
            if negative {
                -number
            } else {
                number
            }
        }
        _ => 0.0,
    }
}

/// `price * (1 - discount / 100)` to two decimals.
#[must_use]
pub fn net_value(price: &str, discount_percent: &str) -> String {
    let net = to_float(price) * (1.0 - to_float(discount_percent) / 100.0);
    format!("{net:.2}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetColumn {
    pub retail_price_index: usize,
    pub discount_percent_index: usize,
    pub header: String,
}

impl NetColumn {
    #[must_use]
    pub fn new(retail_price_index: usize, discount_percent_index: usize) -> Self {
        Self {
            retail_price_index,
            discount_percent_index,
            header: DEFAULT_NET_HEADER.to_string(),
        }
    }

    #[must_use]
    pub fn insert_position(&self) -> usize {
        self.discount_percent_index + 1
    }

    /// Net value for one row, empty when the row is too short to hold both
    /// source columns.
    #[must_use]
    pub fn value_for(&self, row: &[String]) -> String {
        match (
            row.get(self.retail_price_index),
            row.get(self.discount_percent_index),
        ) {
            (Some(price), Some(discount)) => net_value(price, discount),
            _ => String::new(),
        }
    }

    /// Inserts `value` right after the discount column, padding short rows
    /// with empty cells up to the insert position.
    pub(crate) fn insert_into(&self, row: &mut Row, value: String) {
        let position = self.insert_position();
        if row.len() < position {
            row.resize(position, String::new());
        }
        row.insert(position, value);
    }

    /// Adds the computed column to every row.
    pub(crate) fn apply_to_rows(&self, rows: &mut [Row]) {
        for row in rows {
            let value = self.value_for(row);
            self.insert_into(row, value);
        }
    }

    /// Inserts the column name into a header list and reconciles its length
    /// with the widest row after insertion.
    pub(crate) fn apply_to_headers(&self, headers: Vec<String>, row_width: usize) -> Vec<String> {
        let position = self.insert_position();
        let width = headers.len().max(position);
        let mut headers = fit_headers_to_width(headers, width);
        headers.insert(position, self.header.clone());
        fit_headers_to_width(headers, row_width.max(position + 1))
    }
}
