mod common;

use std::process::Command;

use invoice_pdf_to_csv::{
    ExtractOptions, InvoiceDocument, NetColumn, WarningCode, extract_document_to_csv,
    extract_pdf_bytes_to_csv_string, extract_pdf_to_csv, read_document_json,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use common::INVOICE_HEADER as HEADER;

fn invoice_document() -> InvoiceDocument {
    serde_json::from_value(serde_json::json!({
        "pages": [
            {
                "page_number": 1,
                "tables": [
                    [["Invoice 1479909"]],
                    [
                        [HEADER],
                        ["1001 Sample Book Title 5 5  12.50 20% 62.50\n1002 Another Title 8 3 Backordered"]
                    ]
                ]
            },
            {
                "page_number": 2,
                "tables": [
                    [
                        [HEADER],
                        ["2001 Harry Potter Year 2 5 5  7.99 40% 4.79"],
                        ["Continued on next page"]
                    ]
                ]
            }
        ]
    }))
    .expect("document fixture should deserialize")
}

#[test]
fn extracts_document_to_csv_with_quoted_editions() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("invoice.csv");

    let report = extract_document_to_csv(&invoice_document(), &output, &ExtractOptions::default())
        .expect("extraction should succeed");

    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    let lines = csv.lines().collect::<Vec<_>>();
    assert_eq!(
        lines,
        vec![
            "Edition #,Title,Order,Ship,BO,List,Disc,Net,Extension",
            r#""""1001""",Sample Book Title,5,5,,12.50,20%,62.50,"#,
            r#""""1002""",Another Title,8,,3,Backordered,,,"#,
            r#""""2001""",Harry Potter Year 2,5,5,,7.99,40%,4.79,"#,
        ]
    );
    assert_eq!(report.row_count, 3);
    assert_eq!(report.table_count, 2);
    assert_eq!(report.discarded.len(), 2);
    assert!(
        report
            .warnings
            .iter()
            .any(|warning| warning.code == WarningCode::RowsDiscarded)
    );
}

#[test]
fn reads_json_documents_from_disk() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("invoice.json");
    std::fs::write(
        &input,
        serde_json::to_string(&invoice_document()).expect("fixture should serialize"),
    )
    .expect("fixture should be written");

    let document = read_document_json(&input).expect("document should load");
    assert_eq!(document, invoice_document());
    assert_eq!(document.table_count(), 3);
}

#[test]
fn net_column_lands_after_discount() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("net.csv");
    let options = ExtractOptions {
        net: Some(NetColumn::new(5, 6)),
        text_columns: Vec::new(),
        ..ExtractOptions::default()
    };

    extract_document_to_csv(&invoice_document(), &output, &options)
        .expect("extraction should succeed");

    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Edition #,Title,Order,Ship,BO,List,Disc,Item Net,Net,Extension")
    );
    assert_eq!(
        lines.next(),
        Some("1001,Sample Book Title,5,5,,12.50,20%,10.00,62.50,")
    );
}

#[test]
fn extracts_line_items_from_text_pdf() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("invoice.pdf");
    let output = dir.path().join("invoice.csv");

    common::create_test_pdf(
        &input,
        &[vec![
            HEADER,
            "1001 Sample Book Title 5 5  12.50 20% 62.50",
            "1002 Another Title 8 3 Backordered",
        ]],
    )
    .expect("PDF fixture should be created");

    let report = extract_pdf_to_csv(&input, &output, &ExtractOptions::default())
        .expect("extraction should succeed");

    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert!(
        csv.starts_with("Edition #,Title,"),
        "unexpected CSV output: {csv:?}, report: {report:?}"
    );
    assert_eq!(report.table_count, 1);
    assert!(report.row_count >= 1, "report: {report:?}");
}

#[test]
fn pdf_bytes_render_to_csv_string() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("bytes.pdf");
    common::create_test_pdf(
        &input,
        &[vec![HEADER, "1001 Sample Book Title 5 5  12.50 20% 62.50"]],
    )
    .expect("PDF fixture should be created");
    let bytes = std::fs::read(&input).expect("PDF should be readable");

    let (csv, report) = extract_pdf_bytes_to_csv_string(&bytes, &ExtractOptions::default())
        .expect("extraction should succeed");
    assert!(csv.contains("1001"), "unexpected CSV output: {csv:?}");
    assert_eq!(report.table_count, 1);
}

#[test]
fn returns_no_rows_for_single_line_pdf() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("notable.pdf");
    let output = dir.path().join("notable.csv");

    common::create_test_pdf(&input, &[vec!["Thank you for your order."]])
        .expect("PDF fixture should be created");

    let report = extract_pdf_to_csv(&input, &output, &ExtractOptions::default())
        .expect("extraction should succeed");
    assert_eq!(report.row_count, 0);
    assert_eq!(report.table_count, 0);
    assert_eq!(report.warnings[0].code, WarningCode::NoTablesDetected);
}

#[test]
fn cli_exits_with_code_2_when_no_rows() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("cli-empty.pdf");
    let output = dir.path().join("cli-empty.csv");

    common::create_test_pdf(&input, &[vec!["No line items here"]])
        .expect("PDF fixture should be created");

    let status = Command::new(env!("CARGO_BIN_EXE_invoice2csv"))
        .args([
            "extract",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(2));
}

#[test]
fn cli_extracts_json_document() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("cli.json");
    let output = dir.path().join("cli.csv");
    std::fs::write(
        &input,
        serde_json::to_string(&invoice_document()).expect("fixture should serialize"),
    )
    .expect("fixture should be written");

    let status = Command::new(env!("CARGO_BIN_EXE_invoice2csv"))
        .args([
            "extract",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
            "--net",
            "5,6",
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(0));
    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert!(csv.contains("Item Net"), "unexpected CSV output: {csv:?}");
}

#[test]
fn cli_rejects_bad_header_row() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("bad.json");
    let output = dir.path().join("bad.csv");
    std::fs::write(
        &input,
        serde_json::to_string(&invoice_document()).expect("fixture should serialize"),
    )
    .expect("fixture should be written");

    let status = Command::new(env!("CARGO_BIN_EXE_invoice2csv"))
        .args([
            "extract",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
            "--header-row",
            "99",
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(1));
}
