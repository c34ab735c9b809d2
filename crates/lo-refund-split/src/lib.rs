mod archive;
mod assemble;
mod csv_out;
mod error;
mod group;
mod header;
mod model;
mod options;
mod pdf_reader;
mod render;
mod table_detect;
mod table_parse;
mod text_runs;
mod warning;

use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::warning::WarningCode;

pub use archive::{archive_file_name, build_archive, entry_file_name};
pub use assemble::assemble;
pub use csv_out::{table_to_csv_string, write_table_csv};
pub use error::SplitError;
pub use group::{clean_identifier, group_rows};
pub use header::locate_header;
pub use model::{
    Cell, Group, GroupOutcome, Groups, HeaderLocation, RawTable, Row, cell_is_present, cell_text,
};
pub use options::{
    DEFAULT_LABEL, ExtractionStrategy, FALLBACK_BATCH_DATE, LabelMatch, LabelMatcher, PagePolicy,
    SplitOptions, default_batch_date, validate_batch_date,
};
pub use render::{render_summary_page, summary_title};
pub use table_detect::extract_first_page_table;
pub use warning::{SplitWarning, WarningCode as SplitWarningCode};

/// Rows kept in a header-not-found error for diagnostics.
pub const PREVIEW_ROWS: usize = 5;

/// Per-identifier documents produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    pub batch_date: String,
    pub outcomes: Vec<GroupOutcome>,
}

impl SplitOutput {
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        archive_file_name(&self.batch_date)
    }

    pub fn build_archive(&self) -> Result<Vec<u8>, SplitError> {
        build_archive(&self.outcomes)
    }

    #[must_use]
    pub fn built_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_built()).count()
    }

    #[must_use]
    pub fn failed_identifiers(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_built())
            .map(GroupOutcome::identifier)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitReport {
    pub strategy: ExtractionStrategy,
    pub header: HeaderLocation,
    pub row_count: usize,
    pub group_count: usize,
    pub built_count: usize,
    pub page_count: usize,
    pub warnings: Vec<SplitWarning>,
}

/// Everything the pipeline knows about a document before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub strategy: ExtractionStrategy,
    pub table: RawTable,
    pub header: HeaderLocation,
    pub groups: Groups,
    pub page_count: usize,
    pub warnings: Vec<SplitWarning>,
}

impl Inspection {
    #[must_use]
    pub fn header_row(&self) -> &[Cell] {
        self.table
            .rows()
            .get(self.header.row_index)
            .map_or(&[][..], Vec::as_slice)
    }
}

struct LocatedTable {
    strategy: ExtractionStrategy,
    table: RawTable,
    header: HeaderLocation,
}

/// Tries each configured strategy until one yields a table with a header row.
fn extract_with_fallback(
    document: &Document,
    input_pdf: &[u8],
    options: &SplitOptions,
    warnings: &mut Vec<SplitWarning>,
) -> Result<LocatedTable, SplitError> {
    let matcher = options.matcher();
    let mut first_headerless: Option<RawTable> = None;

    for &strategy in &options.strategies {
        let Some(table) = extract_first_page_table(document, input_pdf, strategy) else {
            debug!(%strategy, "strategy found no table");
            warnings.push(
                SplitWarning::new(
                    WarningCode::StrategyFallback,
                    format!("{strategy} extraction found no table on page 1"),
                )
                .with_strategy(strategy),
            );
            continue;
        };

        if let Some(header) = locate_header(&table, &matcher) {
            debug!(
                %strategy,
                rows = table.len(),
                header_row = header.row_index,
                column = header.column_index,
                "located header row"
            );
            return Ok(LocatedTable {
                strategy,
                table,
                header,
            });
        }

        debug!(%strategy, rows = table.len(), "table has no header row");
        warnings.push(
            SplitWarning::new(
                WarningCode::HeaderMissingInStrategy,
                format!(
                    "{strategy} extraction found {} rows but no '{}' header",
                    table.len(),
                    matcher.label()
                ),
            )
            .with_strategy(strategy),
        );
        if first_headerless.is_none() {
            first_headerless = Some(table);
        }
    }

    match first_headerless {
        Some(table) => Err(SplitError::HeaderNotFound {
            label: matcher.label().to_string(),
            preview: table.preview(PREVIEW_ROWS),
        }),
        None => Err(SplitError::NoTableFound),
    }
}

fn load_source(input_pdf: &[u8]) -> Result<(Document, usize), SplitError> {
    let document = Document::load_mem(input_pdf)?;
    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(SplitError::NoPages);
    }
    Ok((document, page_count))
}

/// Runs extraction, header location and grouping without rendering anything.
pub fn inspect_pdf_bytes(
    input_pdf: &[u8],
    options: &SplitOptions,
) -> Result<Inspection, SplitError> {
    options.validate()?;
    let (document, page_count) = load_source(input_pdf)?;

    let mut warnings = Vec::new();
    let located = extract_with_fallback(&document, input_pdf, options, &mut warnings)?;
    let groups = group_rows(
        &located.table,
        located.header.row_index,
        located.header.column_index,
    );

    Ok(Inspection {
        strategy: located.strategy,
        table: located.table,
        header: located.header,
        groups,
        page_count,
        warnings,
    })
}

fn build_group(
    header_row: &[Cell],
    group: &Group,
    source: &Document,
    policy: PagePolicy,
) -> Result<Vec<u8>, SplitError> {
    let summary = render_summary_page(header_row, &group.rows, &group.identifier)?;
    assemble(&summary, source, policy)
}

/// Splits a batch PDF into one document per identifier.
///
/// Fatal conditions (unreadable input, no header, no valid rows, too few
/// pages) stop the run before any group is built. A group that fails to
/// render or assemble is reported as [`GroupOutcome::Failed`] with a
/// warning and the remaining groups still run.
pub fn split_pdf_bytes(
    input_pdf: &[u8],
    options: &SplitOptions,
) -> Result<(SplitOutput, SplitReport), SplitError> {
    options.validate()?;
    let (document, page_count) = load_source(input_pdf)?;

    let mut warnings = Vec::new();
    let LocatedTable {
        strategy,
        table,
        header,
    } = extract_with_fallback(&document, input_pdf, options, &mut warnings)?;

    let groups = group_rows(&table, header.row_index, header.column_index);
    if groups.is_empty() {
        return Err(SplitError::NoValidRows {
            label: options.label.trim().to_string(),
        });
    }
    options.page_policy.check_page_count(page_count)?;

    let header_row = table
        .rows()
        .get(header.row_index)
        .map_or(&[][..], Vec::as_slice);

    let mut outcomes = Vec::with_capacity(groups.len());
    for group in &groups {
        let outcome = match build_group(header_row, group, &document, options.page_policy) {
            Ok(pdf) => GroupOutcome::Built {
                identifier: group.identifier.clone(),
                file_name: entry_file_name(&options.batch_date, &group.identifier),
                row_count: group.rows.len(),
                pdf,
            },
            Err(error) => {
                warn!(identifier = %group.identifier, %error, "failed to build group document");
                warnings.push(
                    SplitWarning::new(WarningCode::GroupFailed, error.to_string())
                        .with_identifier(group.identifier.clone()),
                );
                GroupOutcome::Failed {
                    identifier: group.identifier.clone(),
                    reason: error.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }

    let output = SplitOutput {
        batch_date: options.batch_date.clone(),
        outcomes,
    };
    let report = SplitReport {
        strategy,
        header,
        row_count: groups.row_count(),
        group_count: groups.len(),
        built_count: output.built_count(),
        page_count,
        warnings,
    };
    info!(
        %strategy,
        groups = report.group_count,
        built = report.built_count,
        rows = report.row_count,
        policy = %options.page_policy,
        "split batch document"
    );

    Ok((output, report))
}

/// Splits `input_pdf` and writes the zip archive to `output`, or to
/// `LO_Refunds_{batch_date}.zip` in the current directory when `output` is
/// `None`. The archive only appears once it is complete.
pub fn split_pdf_file(
    input_pdf: &Path,
    output: Option<&Path>,
    options: &SplitOptions,
) -> Result<(PathBuf, SplitReport), SplitError> {
    let bytes = std::fs::read(input_pdf)?;
    let (split, report) = split_pdf_bytes(&bytes, options)?;
    let archive = split.build_archive()?;

    let destination = output.map_or_else(
        || PathBuf::from(split.archive_file_name()),
        Path::to_path_buf,
    );
    let directory = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(&archive)?;
    staged.flush()?;
    staged
        .persist(&destination)
        .map_err(|error| SplitError::Io(error.error))?;

    Ok((destination, report))
}
