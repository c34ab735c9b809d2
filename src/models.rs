use serde::{Deserialize, Serialize};

pub const PAGE_POLICY_VAR: &str = "PAGE_POLICY";
pub const HEADER_LABEL_VAR: &str = "HEADER_LABEL";
pub const LABEL_MATCH_VAR: &str = "LABEL_MATCH";
pub const FALLBACK_BATCH_DATE_VAR: &str = "FALLBACK_BATCH_DATE";

pub const UPLOAD_FILE_FIELD: &str = "file";
pub const BATCH_DATE_FIELD: &str = "batch_date";
pub const FILENAME_QUERY: &str = "filename";

pub const GROUPS_HEADER: &str = "X-Split-Groups";
pub const BUILT_HEADER: &str = "X-Split-Built";
pub const WARNINGS_HEADER: &str = "X-Split-Warnings";
pub const FAILED_HEADER: &str = "X-Split-Failed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSummary {
    pub identifier: String,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarningEntry {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InspectResponse {
    pub strategy: String,
    pub header_row_index: usize,
    pub column_index: usize,
    pub header: Vec<Option<String>>,
    pub groups: Vec<GroupSummary>,
    pub page_count: usize,
    pub warnings: Vec<WarningEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Vec<Vec<Option<String>>>>,
}
