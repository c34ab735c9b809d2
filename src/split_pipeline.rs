use std::str::FromStr;

use lo_refund_split::{
    DEFAULT_LABEL, FALLBACK_BATCH_DATE, LabelMatch, PagePolicy, SplitOptions, SplitWarning,
    archive_file_name, default_batch_date, inspect_pdf_bytes, split_pdf_bytes,
    validate_batch_date,
};

use crate::error::ApiError;
use crate::models::{
    FALLBACK_BATCH_DATE_VAR, GroupSummary, HEADER_LABEL_VAR, InspectResponse, LABEL_MATCH_VAR,
    PAGE_POLICY_VAR, WarningEntry,
};

/// Settings fixed per deployment; requests cannot override them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOptions {
    pub page_policy: PagePolicy,
    pub label: String,
    pub label_match: LabelMatch,
    pub fallback_batch_date: String,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            page_policy: PagePolicy::FullTail,
            label: DEFAULT_LABEL.to_string(),
            label_match: LabelMatch::Exact,
            fallback_batch_date: FALLBACK_BATCH_DATE.to_string(),
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = String>,
{
    lookup(name)
        .map(|value| {
            T::from_str(&value)
                .map_err(|error| ApiError::Internal(format!("invalid {name} setting: {error}")))
        })
        .transpose()
}

/// Reads deployment settings through `lookup`, which maps a variable name to
/// its value. Unset variables keep their defaults.
pub fn parse_deployment_options(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<DeploymentOptions, ApiError> {
    let defaults = DeploymentOptions::default();

    let page_policy = parse_var(&lookup, PAGE_POLICY_VAR)?.unwrap_or(defaults.page_policy);
    let label_match = parse_var(&lookup, LABEL_MATCH_VAR)?.unwrap_or(defaults.label_match);
    let label = lookup(HEADER_LABEL_VAR)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or(defaults.label);
    let fallback_batch_date = lookup(FALLBACK_BATCH_DATE_VAR)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or(defaults.fallback_batch_date);
    validate_batch_date(&fallback_batch_date).map_err(|error| {
        ApiError::Internal(format!("invalid {FALLBACK_BATCH_DATE_VAR} setting: {error}"))
    })?;

    Ok(DeploymentOptions {
        page_policy,
        label,
        label_match,
        fallback_batch_date,
    })
}

/// A PDF received from a client, with whatever naming hints came with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub batch_date: Option<String>,
}

/// Explicit batch date if given, otherwise the upload's file name prefix,
/// otherwise the deployment fallback. An explicit value is used as sent; an
/// empty form field counts as absent.
pub fn resolve_batch_date(upload: &Upload, fallback: &str) -> Result<String, ApiError> {
    let batch_date = match upload
        .batch_date
        .as_deref()
        .filter(|value| !value.is_empty())
    {
        Some(explicit) => explicit.to_string(),
        None => default_batch_date(upload.file_name.as_deref().unwrap_or_default(), fallback),
    };
    validate_batch_date(&batch_date)?;
    Ok(batch_date)
}

fn split_options(
    upload: &Upload,
    deployment: &DeploymentOptions,
) -> Result<SplitOptions, ApiError> {
    Ok(SplitOptions {
        batch_date: resolve_batch_date(upload, &deployment.fallback_batch_date)?,
        page_policy: deployment.page_policy,
        label: deployment.label.clone(),
        label_match: deployment.label_match,
        ..SplitOptions::default()
    })
}

fn warning_entry(warning: &SplitWarning) -> WarningEntry {
    WarningEntry {
        code: warning.code.as_str().to_string(),
        message: warning.message.clone(),
        identifier: warning.identifier.clone(),
        strategy: warning.strategy.map(|strategy| strategy.to_string()),
    }
}

/// A finished archive and the counts reported alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArchive {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub strategy: String,
    pub group_count: usize,
    pub built_count: usize,
    pub warnings: Vec<WarningEntry>,
    pub failed: Vec<String>,
}

fn ensure_pdf(upload: &Upload) -> Result<(), ApiError> {
    if upload.bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded PDF is empty".to_string()));
    }
    Ok(())
}

pub fn split_upload(
    upload: &Upload,
    deployment: &DeploymentOptions,
) -> Result<SplitArchive, ApiError> {
    ensure_pdf(upload)?;
    let options = split_options(upload, deployment)?;
    let (output, report) = split_pdf_bytes(&upload.bytes, &options)?;
    let bytes = output.build_archive()?;

    Ok(SplitArchive {
        bytes,
        file_name: archive_file_name(&options.batch_date),
        strategy: report.strategy.to_string(),
        group_count: report.group_count,
        built_count: report.built_count,
        warnings: report.warnings.iter().map(warning_entry).collect(),
        failed: output
            .failed_identifiers()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

pub fn inspect_upload(
    upload: &Upload,
    deployment: &DeploymentOptions,
) -> Result<InspectResponse, ApiError> {
    ensure_pdf(upload)?;
    let options = split_options(upload, deployment)?;
    let inspection = inspect_pdf_bytes(&upload.bytes, &options)?;

    Ok(InspectResponse {
        strategy: inspection.strategy.to_string(),
        header_row_index: inspection.header.row_index,
        column_index: inspection.header.column_index,
        header: inspection.header_row().to_vec(),
        groups: inspection
            .groups
            .iter()
            .map(|group| GroupSummary {
                identifier: group.identifier.clone(),
                row_count: group.rows.len(),
            })
            .collect(),
        page_count: inspection.page_count,
        warnings: inspection.warnings.iter().map(warning_entry).collect(),
    })
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// encoded name.
pub fn content_disposition(file_name: &str) -> String {
    let ascii = file_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_graphic() && ch != '"' && ch != '\\' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}
