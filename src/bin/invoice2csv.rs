use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use invoice_pdf_to_csv::{
    Action, ActionLog, DEFAULT_TEMPLATES_DIR, ExtractOptions, ExtractWarning, ExtractionReport,
    InvoiceDocument, NetColumn, PageSelection, RowFilter, Template, TemplateStore,
    TokenizerOptions, Worksheet, extract_document_to_csv, parse_net_columns, read_document_json,
    read_invoice_pdf, replay, write_worksheet_csv,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "invoice2csv",
    version,
    about = "Rebuild invoice line items from PDF tables into CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Tokenize invoice lines into named columns and write CSV.
    Extract(ExtractArgs),
    /// Run worksheet cleaning actions (or a saved template) and write CSV.
    Clean(CleanArgs),
    /// Inspect saved templates.
    Templates(TemplatesArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Input PDF, or a JSON document of page tables.
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    output: PathBuf,

    /// Page selection like 1-3,5 (PDF input only).
    #[arg(long)]
    pages: Option<String>,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Add an Item Net column from zero-based price,discount column indexes.
    #[arg(long, value_name = "PRICE,DISCOUNT")]
    net: Option<String>,

    /// Print every warning.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Zero-based index of the header line among the split rows.
    #[arg(long, default_value_t = 0)]
    header_row: usize,

    /// Header column to leave out of the output. Repeatable.
    #[arg(long = "drop-column", default_value = "Location")]
    drop_columns: Vec<String>,

    /// Treat a number after a trailing vol/volume title word as title text.
    #[arg(long)]
    volume_hint: bool,

    /// Keep shelf-location codes at the start of titles.
    #[arg(long)]
    keep_location_codes: bool,
}

#[derive(Debug, Args)]
struct CleanArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Zero-based index of the header row.
    #[arg(long)]
    header_row: Option<usize>,

    /// Split cells holding several lines into one row per line.
    #[arg(long)]
    fix_concatenated: bool,

    /// Drop rows identical to the header row.
    #[arg(long, requires = "header_row")]
    remove_duplicates: bool,

    /// Delete rows whose first cell matches: Empty, Letters, Numbers,
    /// Symbols or a regular expression. Repeatable.
    #[arg(long = "delete", value_name = "FILTER")]
    delete: Vec<String>,

    /// Replay a saved template file instead of the action flags.
    #[arg(
        long,
        conflicts_with_all = ["header_row", "fix_concatenated", "remove_duplicates", "delete", "net"]
    )]
    template: Option<String>,

    /// Save the actions that ran as a template with this name.
    #[arg(long, value_name = "NAME")]
    save_template: Option<String>,

    #[arg(long, env = "INVOICE_TEMPLATES_DIR", default_value = DEFAULT_TEMPLATES_DIR)]
    templates_dir: PathBuf,
}

#[derive(Debug, Args)]
struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplateCommands,

    #[arg(long, env = "INVOICE_TEMPLATES_DIR", default_value = DEFAULT_TEMPLATES_DIR, global = true)]
    templates_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
enum TemplateCommands {
    /// List template files.
    List,
    /// Print the steps of one template.
    Show { file: String },
}

fn parse_pages(pages: Option<&str>) -> Result<Option<PageSelection>> {
    pages
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")
}

fn parse_net(net: Option<&str>) -> Result<Option<NetColumn>> {
    net.map(parse_net_columns)
        .transpose()
        .map_err(|error| anyhow!(error))
        .context("failed to parse --net")
}

fn parse_delimiter(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| anyhow!("delimiter must be a single ASCII character"))
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
}

fn load_document(args: &InputArgs, pages: Option<&PageSelection>) -> Result<InvoiceDocument> {
    let document = if is_pdf(&args.input) {
        read_invoice_pdf(&args.input, pages)
    } else {
        read_document_json(&args.input)
    };
    document.with_context(|| format!("failed to read '{}'", args.input.display()))
}

fn log_warnings(warnings: &[ExtractWarning], verbose: bool) {
    if warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", warnings.len());
    if verbose {
        for warning in warnings {
            match warning.page {
                Some(page) => eprintln!("  - {:?} page={page}: {warning}", warning.code),
                None => eprintln!("  - {:?}: {warning}", warning.code),
            }
        }
    }
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    log_warnings(&report.warnings, verbose);
    if verbose {
        for row in &report.discarded {
            eprintln!("  - discarded page={} ({}): {}", row.page, row.reason, row.text);
        }
    }
}

fn run_extract(args: &ExtractArgs) -> Result<usize> {
    let pages = parse_pages(args.input.pages.as_deref())?;
    let options = ExtractOptions {
        header_row_index: args.header_row,
        dropped_columns: args.drop_columns.clone(),
        delimiter: parse_delimiter(args.input.delimiter)?,
        net: parse_net(args.input.net.as_deref())?,
        strip_location_codes: !args.keep_location_codes,
        tokenizer: TokenizerOptions {
            volume_title_hint: args.volume_hint,
        },
        pages,
        ..ExtractOptions::default()
    };

    let document = load_document(&args.input, options.pages.as_ref())?;
    let report = extract_document_to_csv(&document, &args.input.output, &options)
        .with_context(|| {
            format!(
                "failed to extract line items from '{}'",
                args.input.input.display()
            )
        })?;
    log_report(&report, args.input.verbose);
    Ok(report.row_count)
}

fn flag_actions(args: &CleanArgs) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    if let Some(header_row_index) = args.header_row {
        actions.push(Action::ApplyHeaders { header_row_index });
    }
    if let (true, Some(header_row_index)) = (args.remove_duplicates, args.header_row) {
        actions.push(Action::RemoveDuplicates { header_row_index });
    }
    if args.fix_concatenated {
        actions.push(Action::FixConcatenated);
    }
    for filter in &args.delete {
        let filter = RowFilter::from_str(filter)
            .map_err(|error| anyhow!(error))
            .with_context(|| format!("failed to parse --delete '{filter}'"))?;
        actions.push(Action::DeleteUnwantedRows {
            pattern: filter.pattern(),
        });
    }
    if let Some(net) = parse_net(args.input.net.as_deref())? {
        actions.push(Action::AddNetItemCol {
            retail_price_index: net.retail_price_index,
            discount_percent_index: net.discount_percent_index,
        });
    }
    Ok(actions)
}

fn run_clean(args: &CleanArgs) -> Result<usize> {
    let pages = parse_pages(args.input.pages.as_deref())?;
    let original = Worksheet::from_document(&load_document(&args.input, pages.as_ref())?);
    let store = TemplateStore::new(&args.templates_dir);
    let mut log = ActionLog::new();

    let sheet = if let Some(file) = &args.template {
        let template = store
            .load(file)
            .with_context(|| format!("failed to load template '{file}'"))?;
        let outcome = replay(&template, &original, Some(&mut log));
        log_warnings(&outcome.warnings, args.input.verbose);
        outcome.sheet
    } else {
        let mut sheet = original;
        for action in flag_actions(args)? {
            let label = action.label();
            sheet = log
                .run(&sheet, action)
                .with_context(|| format!("failed to apply '{label}'"))?
                .sheet;
        }
        sheet
    };

    if let Some(name) = &args.save_template {
        let template = Template::from_log(name.as_str(), &log);
        for message in &template.warnings {
            eprintln!("warning: {message}");
        }
        let path = store.save(&template).context("failed to save template")?;
        eprintln!("saved template to {}", path.display());
    }

    let options = ExtractOptions {
        delimiter: parse_delimiter(args.input.delimiter)?,
        ..ExtractOptions::default()
    };
    write_worksheet_csv(&sheet, &args.input.output, &options)
        .with_context(|| format!("failed to write '{}'", args.input.output.display()))
}

fn run_templates(args: &TemplatesArgs) -> Result<()> {
    let store = TemplateStore::new(&args.templates_dir);
    match &args.command {
        TemplateCommands::List => {
            for name in store.list().context("failed to list templates")? {
                println!("{name}");
            }
        }
        TemplateCommands::Show { file } => {
            let template = store
                .load(file)
                .with_context(|| format!("failed to load template '{file}'"))?;
            println!(
                "{} (version {}, {})",
                template.name, template.version, template.created_at
            );
            for (index, step) in template.actions.iter().enumerate() {
                let label = Action::from_step(step).map_or_else(
                    |error| format!("{} [{error}]", step.kind),
                    |action| action.label(),
                );
                println!("{:>3}. {label}", index + 1);
            }
            for message in &template.warnings {
                eprintln!("warning: {message}");
            }
        }
    }
    Ok(())
}

fn exit_code_for_rows(result: Result<usize>) -> ExitCode {
    match result {
        Ok(rows) if rows > 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("invoice_pdf_to_csv=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => exit_code_for_rows(run_extract(&args)),
        Commands::Clean(args) => exit_code_for_rows(run_clean(&args)),
        Commands::Templates(args) => match run_templates(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
