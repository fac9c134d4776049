mod actions;
mod cell_split;
mod csv_out;
mod error;
mod header;
mod model;
mod net_value;
mod options;
mod pdf_reader;
mod row_filter;
mod template;
mod title_clean;
mod tokenizer;
mod warning;
mod worksheet;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::cell_split::split_concatenated_rows;
use crate::csv_out::{CsvTable, write_csv, write_csv_to_string};
use crate::pdf_reader::{read_pdf_document, read_pdf_document_from_bytes};

pub use actions::{Action, ActionLog, ActionStep, Applied, LoggedAction};
pub use error::{ActionError, ExtractError};
pub use header::ColumnSchema;
pub use model::{DiscardReason, DiscardedRow, InvoiceDocument, InvoiceTable, PageTables, Row};
pub use net_value::{DEFAULT_NET_HEADER, NetColumn, net_value, to_float};
pub use options::{
    DEFAULT_DROPPED_COLUMN, DEFAULT_TEXT_COLUMN, ExtractOptions, PageSelection, parse_net_columns,
};
pub use row_filter::{
    EMPTY_PATTERN, LETTERS_PATTERN, NUMBERS_PATTERN, RowFilter, SYMBOLS_PATTERN, compile_pattern,
};
pub use template::{
    DEFAULT_TEMPLATES_DIR, ReplayOutcome, TEMPLATE_VERSION, Template, TemplateStore, replay,
    sanitize_filename,
};
pub use title_clean::strip_location_codes;
pub use tokenizer::{
    RowShape, TokenizedRow, TokenizerOptions, is_digit_token, is_percent_token, is_price_token,
    tokenize_row,
};
pub use warning::{ExtractWarning, WarningCode};
pub use worksheet::{DisplayTable, Worksheet};

const TITLE_COLUMN: &str = "Title";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    pub row_count: usize,
    pub table_count: usize,
    pub discarded: Vec<DiscardedRow>,
    pub warnings: Vec<ExtractWarning>,
}

fn validate_options(options: &ExtractOptions) -> Result<(), ExtractError> {
    if matches!(options.delimiter, b'"' | b'\n' | b'\r') {
        return Err(ExtractError::InvalidOption(format!(
            "delimiter {:?} cannot be used in CSV output",
            char::from(options.delimiter)
        )));
    }
    Ok(())
}

/// Whitespace-insensitive comparison used to spot header lines repeated on
/// later pages.
fn same_line(left: &str, right: &str) -> bool {
    left.split_whitespace().eq(right.split_whitespace())
}

/// Split logical rows of every usable table, tagged with their page.
fn logical_rows(document: &InvoiceDocument) -> (Vec<(u32, Row)>, usize) {
    let mut rows = Vec::new();
    let mut table_count = 0;
    for page in &document.pages {
        for table in &page.tables {
            // Single-row fragments are page furniture, not line items.
            if table.len() < 2 {
                continue;
            }
            table_count += 1;
            let (split, _) = split_concatenated_rows(table, None);
            rows.extend(split.into_iter().map(|row| (page.page_number, row)));
        }
    }
    (rows, table_count)
}

/// Runs the line-item engine over a whole document: split cells, take the
/// schema from the header line, tokenize every later line and reconcile it to
/// the schema.
///
/// Rows before the header line are preamble and are ignored.
///
/// # Errors
///
/// Returns [`ExtractError::HeaderRowOutOfRange`] when the document has usable
/// tables but fewer logical rows than `options.header_row_index + 1`, and
/// [`ExtractError::InvalidOption`] for an unusable delimiter.
pub fn extract_invoice(
    document: &InvoiceDocument,
    options: &ExtractOptions,
) -> Result<(InvoiceTable, usize, Vec<ExtractWarning>), ExtractError> {
    validate_options(options)?;

    let mut warnings = Vec::new();
    let (rows, table_count) = logical_rows(document);
    if table_count == 0 {
        warnings.push(ExtractWarning::new(
            WarningCode::NoTablesDetected,
            "no tables with at least two rows were found",
        ));
        return Ok((InvoiceTable::default(), 0, warnings));
    }

    let Some((_, header_row)) = rows.get(options.header_row_index) else {
        return Err(ExtractError::HeaderRowOutOfRange {
            index: options.header_row_index,
            available: rows.len(),
        });
    };
    let header_text = header_row.first().map_or("", String::as_str);
    let schema = ColumnSchema::from_header_text(header_text, &options.dropped_columns);
    debug!(columns = ?schema.names(), "derived column schema");

    let title_position = schema.position(TITLE_COLUMN);
    let mut records = Vec::new();
    let mut discarded = Vec::new();
    for (page, row) in &rows[options.header_row_index + 1..] {
        let text = row.first().map_or("", |cell| cell.trim());
        let outcome = if text.is_empty() {
            Err(DiscardReason::EmptyRow)
        } else if same_line(text, header_text) {
            Err(DiscardReason::RepeatedHeader)
        } else {
            tokenize_row(text, options.tokenizer)
        };

        match outcome {
            Ok(tokenized) => {
                let mut record = schema.reconcile(&tokenized.fields);
                if options.strip_location_codes {
                    if let Some(title) = title_position.and_then(|index| record.get_mut(index)) {
                        *title = strip_location_codes(title);
                    }
                }
                records.push(record);
            }
            Err(reason) => {
                debug!(page = *page, %reason, text, "discarded row");
                discarded.push(DiscardedRow {
                    page: *page,
                    text: text.to_string(),
                    reason,
                });
            }
        }
    }

    let mut headers = schema.into_names();
    if let Some(net) = &options.net {
        net.apply_to_rows(&mut records);
        let width = records.iter().map(Vec::len).max().unwrap_or(0);
        headers = net.apply_to_headers(headers, width);
        // Rows narrower than the header list after insertion.
        for record in &mut records {
            record.resize(headers.len(), String::new());
        }
    }

    let mut discarded_per_page = BTreeMap::<u32, usize>::new();
    for row in &discarded {
        *discarded_per_page.entry(row.page).or_default() += 1;
    }
    for (page, count) in discarded_per_page {
        warnings.push(
            ExtractWarning::new(
                WarningCode::RowsDiscarded,
                format!("{count} row(s) discarded as noise"),
            )
            .with_page(page),
        );
    }

    Ok((
        InvoiceTable {
            headers,
            records,
            discarded,
        },
        table_count,
        warnings,
    ))
}

fn report_for(
    table: InvoiceTable,
    table_count: usize,
    warnings: Vec<ExtractWarning>,
) -> ExtractionReport {
    ExtractionReport {
        row_count: table.records.len(),
        table_count,
        discarded: table.discarded,
        warnings,
    }
}

fn csv_table<'a>(table: &'a InvoiceTable, options: &'a ExtractOptions) -> CsvTable<'a> {
    CsvTable {
        headers: &table.headers,
        rows: &table.records,
        delimiter: options.delimiter,
        text_columns: &options.text_columns,
    }
}

/// Reads a document in the `{"pages": [{"page_number", "tables"}]}` layout.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not such a document.
pub fn read_document_json(path: &Path) -> Result<InvoiceDocument, ExtractError> {
    let body = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&body)?)
}

/// Reads a text PDF into one single-column table per page.
///
/// # Errors
///
/// Returns an error if the PDF cannot be loaded or no page is selected.
pub fn read_invoice_pdf(
    path: &Path,
    pages: Option<&PageSelection>,
) -> Result<InvoiceDocument, ExtractError> {
    read_pdf_document(path, pages)
}

/// # Errors
///
/// Returns an error if extraction fails or the CSV cannot be written.
pub fn extract_document_to_csv(
    document: &InvoiceDocument,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let (table, table_count, warnings) = extract_invoice(document, options)?;
    write_csv(output_csv, &csv_table(&table, options))?;
    Ok(report_for(table, table_count, warnings))
}

/// # Errors
///
/// Returns an error if the PDF cannot be read, extraction fails or the CSV
/// cannot be written.
pub fn extract_pdf_to_csv(
    input_pdf: &Path,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let document = read_pdf_document(input_pdf, options.pages.as_ref())?;
    extract_document_to_csv(&document, output_csv, options)
}

/// # Errors
///
/// Returns an error if the PDF cannot be read or extraction fails.
pub fn extract_pdf_bytes_to_csv_string(
    input_pdf: &[u8],
    options: &ExtractOptions,
) -> Result<(String, ExtractionReport), ExtractError> {
    let document = read_pdf_document_from_bytes(input_pdf, options.pages.as_ref())?;
    let (table, table_count, warnings) = extract_invoice(&document, options)?;
    let csv = write_csv_to_string(&csv_table(&table, options))?;
    Ok((csv, report_for(table, table_count, warnings)))
}

/// Writes the worksheet's display table (header row hidden, rows padded).
///
/// # Errors
///
/// Returns an error if the CSV cannot be written.
pub fn write_worksheet_csv(
    sheet: &Worksheet,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<usize, ExtractError> {
    validate_options(options)?;
    let display = sheet.display();
    write_csv(
        output_csv,
        &CsvTable {
            headers: &display.headers,
            rows: &display.rows,
            delimiter: options.delimiter,
            text_columns: &options.text_columns,
        },
    )?;
    Ok(display.rows.len())
}
