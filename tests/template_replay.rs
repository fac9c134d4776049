use std::path::Path;
use std::process::Command;

use invoice_pdf_to_csv::{
    Action, ActionLog, InvoiceDocument, PageTables, Template, TemplateStore, WarningCode,
    Worksheet, replay,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| (*cell).to_string()).collect()
}

fn document() -> InvoiceDocument {
    InvoiceDocument {
        pages: vec![
            PageTables {
                page_number: 1,
                tables: vec![vec![
                    row(&["Edition #", "Title", "List", "Disc"]),
                    row(&["1001\n1002", "Book A\nBook B", "25.00\n10.00", "20%\n0"]),
                    row(&["Page 1 of 2", "", "", ""]),
                ]],
            },
            PageTables {
                page_number: 2,
                tables: vec![vec![
                    row(&["Edition #", "Title", "List", "Disc"]),
                    row(&["1003", "Book C", "8.00", "50%"]),
                ]],
            },
        ],
    }
}

fn write_document(path: &Path) {
    std::fs::write(
        path,
        serde_json::to_string(&document()).expect("fixture should serialize"),
    )
    .expect("fixture should be written");
}

#[test]
fn session_saved_as_template_replays_identically() {
    let dir = tempdir().expect("tempdir should be created");
    let store = TemplateStore::new(dir.path());
    let original = Worksheet::from_document(&document());

    let mut log = ActionLog::new();
    let mut sheet = original.clone();
    for action in [
        Action::ApplyHeaders { header_row_index: 0 },
        Action::RemoveDuplicates { header_row_index: 0 },
        Action::FixConcatenated,
        Action::DeleteUnwantedRows {
            pattern: "^Page".to_string(),
        },
        Action::AddNetItemCol {
            retail_price_index: 2,
            discount_percent_index: 3,
        },
    ] {
        sheet = log.run(&sheet, action).expect("action should apply").sheet;
    }

    let display = sheet.display();
    assert_eq!(display.headers, row(&["Edition #", "Title", "List", "Disc", "Item Net"]));
    assert_eq!(
        display.rows,
        vec![
            row(&["1001", "Book A", "25.00", "20%", "20.00"]),
            row(&["1002", "Book B", "10.00", "0", "10.00"]),
            row(&["1003", "Book C", "8.00", "50%", "4.00"]),
        ]
    );

    let path = store
        .save(&Template::from_log("Acme Books", &log))
        .expect("template should save");
    assert!(path.ends_with("Acme_Books.json"));

    let loaded = store.load("Acme_Books.json").expect("template should load");
    assert_eq!(loaded.actions.len(), 5);
    assert!(loaded.warnings.is_empty());

    let mut replay_log = ActionLog::new();
    let outcome = replay(&loaded, &original, Some(&mut replay_log));
    assert_eq!(outcome.sheet, sheet);
    assert_eq!(outcome.matched, vec![(3, "Page 1 of 2".to_string())]);
    assert_eq!(replay_log.applied().len(), 5);

    // Each replayed step can be undone on its own.
    let before_net = replay_log.undo().expect("net step should undo");
    assert_eq!(before_net.display().headers.len(), 4);
}

#[test]
fn hand_edited_template_reports_bad_steps() {
    let dir = tempdir().expect("tempdir should be created");
    std::fs::write(
        dir.path().join("edited.json"),
        r#"{
            "name": "edited",
            "version": "K",
            "created_at": "2024-05-01T10:00:00Z",
            "actions": [
                {"type": "apply_headers", "params": {"header_row_index": 0}},
                {"type": "delete_unwanted_rows", "params": {"pattern": null}},
                {"type": "add_net_item_col", "params": {"retail_price_index": "two", "discount_percent_index": 3}},
                {"type": "merge_cells", "params": {}}
            ]
        }"#,
    )
    .expect("template should be written");

    let template = TemplateStore::new(dir.path())
        .load("edited.json")
        .expect("template should load");
    let outcome = replay(&template, &Worksheet::from_document(&document()), None);

    let codes = outcome
        .warnings
        .iter()
        .map(|warning| (warning.step, warning.code))
        .collect::<Vec<_>>();
    assert_eq!(
        codes,
        vec![
            (Some(1), WarningCode::MissingParameter),
            (Some(2), WarningCode::InvalidParameter),
            (Some(3), WarningCode::UnknownAction),
        ]
    );
    assert_eq!(outcome.sheet.header_row_index(), Some(0));
}

#[test]
fn cli_saves_lists_and_replays_templates() {
    let dir = tempdir().expect("tempdir should be created");
    let templates = dir.path().join("templates");
    let input = dir.path().join("doc.json");
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    write_document(&input);

    let status = Command::new(env!("CARGO_BIN_EXE_invoice2csv"))
        .args([
            "clean",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &first.to_string_lossy(),
            "--header-row",
            "0",
            "--remove-duplicates",
            "--fix-concatenated",
            "--delete",
            "^Page",
            "--net",
            "2,3",
            "--save-template",
            "acme",
        ])
        .env("INVOICE_TEMPLATES_DIR", &templates)
        .status()
        .expect("CLI should run");
    assert_eq!(status.code(), Some(0));

    let listed = Command::new(env!("CARGO_BIN_EXE_invoice2csv"))
        .args(["templates", "list"])
        .env("INVOICE_TEMPLATES_DIR", &templates)
        .output()
        .expect("CLI should run");
    assert_eq!(String::from_utf8_lossy(&listed.stdout).trim(), "acme.json");

    let status = Command::new(env!("CARGO_BIN_EXE_invoice2csv"))
        .args([
            "clean",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &second.to_string_lossy(),
            "--template",
            "acme.json",
        ])
        .env("INVOICE_TEMPLATES_DIR", &templates)
        .status()
        .expect("CLI should run");
    assert_eq!(status.code(), Some(0));

    let first = std::fs::read_to_string(&first).expect("first CSV should be readable");
    let second = std::fs::read_to_string(&second).expect("second CSV should be readable");
    assert_eq!(first, second);
    assert!(first.starts_with("Edition #,Title,List,Disc,Item Net\n"));
    assert!(first.contains(r#""""1003""",Book C,8.00,50%,4.00"#));
}
