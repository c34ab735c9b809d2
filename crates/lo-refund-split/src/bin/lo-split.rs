use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use lo_refund_split::{
    DEFAULT_LABEL, ExtractionStrategy, FALLBACK_BATCH_DATE, Inspection, LabelMatch, PagePolicy,
    SplitError, SplitOptions, SplitReport, SplitWarning, default_batch_date, inspect_pdf_bytes,
    split_pdf_file, table_to_csv_string, write_table_csv,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "lo-split",
    version,
    about = "Split an LO refund batch PDF into one document per LO number"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build per-LO documents and write them into a zip archive.
    Split(SplitArgs),
    /// Show the table, header and groups found on page 1 without rendering.
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
struct MatchArgs {
    /// Header label marking the grouping column.
    #[arg(long, default_value = DEFAULT_LABEL)]
    label: String,

    /// How header cells are compared with the label: exact, case-insensitive or token.
    #[arg(long, default_value = "exact")]
    label_match: String,

    /// Extraction strategy to try, in order. Repeatable. Defaults to positioned, text-gaps.
    #[arg(long = "strategy")]
    strategies: Vec<String>,
}

#[derive(Debug, Args)]
struct SplitArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output zip path. Defaults to LO_Refunds_{batch}.zip in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Prefix for file names inside the archive. Defaults to the first six
    /// digits of the input file name.
    #[arg(long)]
    batch_date: Option<String>,

    /// Source pages to append after the summary: fixed-tail or full-tail.
    #[arg(long, default_value = "full-tail")]
    policy: String,

    #[command(flatten)]
    matching: MatchArgs,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    matching: MatchArgs,

    /// Write the extracted page-1 table to this CSV file.
    #[arg(long)]
    dump_csv: Option<PathBuf>,

    /// Number of raw table rows to print.
    #[arg(long, default_value_t = 5)]
    preview: usize,
}

fn parse_strategies(values: &[String]) -> Result<Vec<ExtractionStrategy>> {
    if values.is_empty() {
        return Ok(SplitOptions::default().strategies);
    }

    values
        .iter()
        .map(|value| {
            ExtractionStrategy::from_str(value)
                .map_err(|error| anyhow!("invalid strategy: {error}"))
                .with_context(|| format!("failed to parse --strategy '{value}'"))
        })
        .collect()
}

fn parse_match_options(args: &MatchArgs) -> Result<SplitOptions> {
    let label_match = LabelMatch::from_str(&args.label_match)
        .map_err(|error| anyhow!("invalid label match: {error}"))
        .context("failed to parse --label-match")?;

    Ok(SplitOptions {
        label: args.label.clone(),
        label_match,
        strategies: parse_strategies(&args.strategies)?,
        ..SplitOptions::default()
    })
}

fn input_file_name(input: &Path) -> String {
    input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn parse_split_options(args: &SplitArgs) -> Result<SplitOptions> {
    let page_policy = PagePolicy::from_str(&args.policy)
        .map_err(|error| anyhow!("invalid page policy: {error}"))
        .context("failed to parse --policy")?;

    let batch_date = args.batch_date.clone().unwrap_or_else(|| {
        default_batch_date(&input_file_name(&args.input), FALLBACK_BATCH_DATE)
    });

    Ok(SplitOptions {
        batch_date,
        page_policy,
        ..parse_match_options(&args.matching)?
    })
}

fn describe_warning(warning: &SplitWarning) -> String {
    let mut line = format!("  - {}", warning.code.as_str());
    if let Some(strategy) = warning.strategy {
        line.push_str(&format!(" strategy={strategy}"));
    }
    if let Some(identifier) = &warning.identifier {
        line.push_str(&format!(" lo={identifier}"));
    }
    line.push_str(&format!(": {}", warning.message));
    line
}

fn log_report(report: &SplitReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!("{}", describe_warning(warning));
        }
    }
}

fn print_preview(error: &SplitError) {
    let Some(preview) = error.preview() else {
        return;
    };
    if let Ok(csv) = table_to_csv_string(preview) {
        eprintln!("first rows read from page 1:");
        eprint!("{csv}");
    }
}

fn run_split(args: &SplitArgs) -> Result<(PathBuf, SplitReport)> {
    let options = parse_split_options(args)?;
    split_pdf_file(&args.input, args.output.as_deref(), &options).map_err(|error| {
        print_preview(&error);
        anyhow::Error::new(error)
            .context(format!("failed to split '{}'", args.input.display()))
    })
}

fn print_inspection(inspection: &Inspection, preview: usize) -> Result<()> {
    println!("strategy: {}", inspection.strategy);
    println!("pages: {}", inspection.page_count);
    println!(
        "header: row {} column {}",
        inspection.header.row_index + 1,
        inspection.header.column_index + 1
    );
    print!(
        "{}",
        table_to_csv_string(&inspection.table.preview(preview))
            .context("failed to format table preview")?
    );
    println!("groups: {}", inspection.groups.len());
    for group in &inspection.groups {
        println!("  {}: {} row(s)", group.identifier, group.rows.len());
    }
    for warning in &inspection.warnings {
        eprintln!("{}", describe_warning(warning));
    }
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<Inspection> {
    let options = parse_match_options(&args.matching)?;
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;
    let inspection = inspect_pdf_bytes(&bytes, &options).map_err(|error| {
        print_preview(&error);
        anyhow::Error::new(error)
            .context(format!("failed to inspect '{}'", args.input.display()))
    })?;

    if let Some(path) = &args.dump_csv {
        write_table_csv(path, inspection.table.rows())
            .with_context(|| format!("failed to write '{}'", path.display()))?;
    }
    print_inspection(&inspection, args.preview)?;
    Ok(inspection)
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lo_refund_split=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Split(args) => match run_split(&args) {
            Ok((path, report)) => {
                log_report(&report, args.verbose);
                println!("{}", path.display());
                if report.built_count > 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        Commands::Inspect(args) => match run_inspect(&args) {
            Ok(inspection) => {
                if inspection.groups.is_empty() {
                    ExitCode::from(2)
                } else {
                    ExitCode::SUCCESS
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
