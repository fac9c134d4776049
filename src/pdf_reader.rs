//! Minimal text-PDF reader: every page becomes one table whose rows are the
//! page's text lines, one cell each. Column recovery happens later in the
//! tokenizer, so this module only has to get the line text right.

use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::UTF_16BE;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::ExtractError;
use crate::model::{InvoiceDocument, PageTables, Row};
use crate::options::PageSelection;
use crate::tokenizer::{TokenizerOptions, tokenize_row};

const UNSCORED: i64 = i64::MIN / 4;

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();
    replacement * 8 > total || control * 5 > total
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes);
    let (text, had_errors) = UTF_16BE.decode_without_bom_handling(bytes);
    (!had_errors && !text.is_empty()).then(|| text.into_owned())
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let wide_font = encoding.is_some_and(|name| {
        let lower = name.to_ascii_lowercase();
        ["utf16", "ucs2", "identity-h", "unicode"]
            .iter()
            .any(|marker| lower.contains(marker))
    });
    if bytes.starts_with(&[0xFE, 0xFF]) || wide_font {
        if let Some(text) = decode_utf16(bytes) {
            return text;
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Favours text whose lines tokenize as invoice rows.
fn invoice_line_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return UNSCORED;
    }

    let mut non_empty_lines = 0_i64;
    let mut invoice_lines = 0_i64;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        non_empty_lines += 1;
        if tokenize_row(line, TokenizerOptions::default()).is_ok() {
            invoice_lines += 1;
        }
    }

    let broken_penalty = if looks_decoding_broken(text) { 800 } else { 0 };
    invoice_lines * 50 + non_empty_lines - broken_penalty
}

fn choose_best_text(candidates: Vec<String>) -> String {
    candidates
        .into_iter()
        .max_by_key(|text| invoice_line_score(text))
        .unwrap_or_default()
}

fn extract_text_from_page_content(document: &Document, page_id: ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
                Object::Array(items) => collect_text(text, encoding, items),
                // Large negative kerning in a TJ array is a visual gap.
                Object::Integer(value) if *value < -100 => text.push(' '),
                Object::Real(value) if *value < -100.0 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|font_name| encodings.get(font_name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" => {
                if !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            _ => {}
        }
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Inner spacing is kept: a double space marks an empty column.
fn page_rows(text: &str) -> Vec<Row> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| vec![line.to_string()])
        .collect()
}

/// Picks the best text per page among pdf-extract's per-page output, the raw
/// content-stream operators and lopdf's own extractor.
fn read_document(
    document: &Document,
    pdf_extract_text: Option<String>,
    page_selection: Option<&PageSelection>,
) -> Result<InvoiceDocument, ExtractError> {
    let pages_map = document.get_pages();
    let mut per_page = pdf_extract_text
        .map(|text| split_text_into_pages(&text))
        .filter(|pages| pages.len() == pages_map.len());

    let mut pages = Vec::new();
    for (index, (page_no, page_id)) in pages_map.iter().enumerate() {
        if page_selection.is_some_and(|selection| !selection.contains(*page_no)) {
            continue;
        }

        let mut candidates = Vec::new();
        if let Some(text) = per_page
            .as_mut()
            .and_then(|texts| texts.get_mut(index))
            .map(std::mem::take)
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }
        if let Some(text) = extract_text_from_page_content(document, *page_id) {
            candidates.push(text);
        }
        if let Some(text) = document
            .extract_text(&[*page_no])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }

        let rows = page_rows(&choose_best_text(candidates));
        debug!(page = *page_no, lines = rows.len(), "read page text");
        pages.push(PageTables {
            page_number: *page_no,
            tables: if rows.is_empty() { Vec::new() } else { vec![rows] },
        });
    }

    if pages.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }
    Ok(InvoiceDocument { pages })
}

pub(crate) fn read_pdf_document(
    input_pdf: &Path,
    page_selection: Option<&PageSelection>,
) -> Result<InvoiceDocument, ExtractError> {
    let document = Document::load(input_pdf)?;
    read_document(&document, pdf_extract::extract_text(input_pdf).ok(), page_selection)
}

pub(crate) fn read_pdf_document_from_bytes(
    input_pdf: &[u8],
    page_selection: Option<&PageSelection>,
) -> Result<InvoiceDocument, ExtractError> {
    let document = Document::load_mem(input_pdf)?;
    read_document(
        &document,
        pdf_extract::extract_text_from_mem(input_pdf).ok(),
        page_selection,
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{choose_best_text, decode_pdf_bytes, page_rows, split_text_into_pages};

    #[test]
    fn splits_form_feed_delimited_pages() {
        let pages = split_text_into_pages("p1\u{000C}p2\u{000C}");
        assert_eq!(pages, vec!["p1", "p2"]);
    }

    #[test]
    fn decodes_utf16_strings_from_wide_fonts() {
        let bytes = [0xFE, 0xFF, 0x00, 0x54, 0x00, 0x69, 0x00, 0x74, 0x00, 0x6C, 0x00, 0x65];
        assert_eq!(decode_pdf_bytes(Some("Identity-H"), &bytes), "Title");
    }

    #[test]
    fn prefers_text_with_invoice_lines() {
        let garbled = "Sample Book Title\n5\n5\n12.50".to_string();
        let lined = "1001 Sample Book Title 5 5 12.50 20% 62.50".to_string();
        assert_eq!(choose_best_text(vec![garbled, lined.clone()]), lined);
    }

    #[test]
    fn page_lines_become_single_cell_rows() {
        assert_eq!(
            page_rows("  Invoice 42 \n\n1001 Title 5 5  9.99\n"),
            vec![
                vec!["Invoice 42".to_string()],
                vec!["1001 Title 5 5  9.99".to_string()]
            ]
        );
    }
}
