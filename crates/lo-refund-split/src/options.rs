use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::SplitError;

pub const DEFAULT_LABEL: &str = "LO";
pub const FALLBACK_BATCH_DATE: &str = "112425";
const BATCH_DATE_PREFIX_LEN: usize = 6;

/// Which source pages follow the rendered summary page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePolicy {
    /// Summary page, then the source's last two pages.
    FixedTail,
    /// Summary page, then every source page after the first.
    FullTail,
}

impl PagePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedTail => "fixed-tail",
            Self::FullTail => "full-tail",
        }
    }

    #[must_use]
    pub const fn min_pages(self) -> usize {
        match self {
            Self::FixedTail => 3,
            Self::FullTail => 1,
        }
    }

    pub fn check_page_count(self, page_count: usize) -> Result<(), SplitError> {
        if page_count < self.min_pages() {
            return Err(SplitError::TooFewPages {
                policy: self,
                required: self.min_pages(),
                actual: page_count,
            });
        }
        Ok(())
    }

    /// 1-based source page numbers kept after the summary page, in order.
    #[must_use]
    pub fn select_pages(self, page_count: usize) -> Vec<u32> {
        let count = u32::try_from(page_count).unwrap_or(u32::MAX);
        match self {
            Self::FixedTail if count >= 2 => vec![count - 1, count],
            Self::FixedTail => Vec::new(),
            Self::FullTail => (2..=count).collect(),
        }
    }
}

impl Display for PagePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PagePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed-tail" | "fixed_tail" => Ok(Self::FixedTail),
            "full-tail" | "full_tail" => Ok(Self::FullTail),
            other => Err(format!(
                "unknown page policy '{other}', expected fixed-tail or full-tail"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    Exact,
    CaseInsensitive,
    /// The label's words appear as consecutive words of the cell, e.g. `LO`
    /// in `LO Number` or `LO No` in `Refund LO No.`.
    Token,
}

impl FromStr for LabelMatch {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "case-insensitive" | "case_insensitive" | "ignore-case" => Ok(Self::CaseInsensitive),
            "token" => Ok(Self::Token),
            other => Err(format!(
                "unknown label match '{other}', expected exact, case-insensitive or token"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    label: String,
    mode: LabelMatch,
}

impl LabelMatcher {
    #[must_use]
    pub fn new(label: impl Into<String>, mode: LabelMatch) -> Self {
        Self {
            label: label.into().trim().to_string(),
            mode,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn matches(&self, cell: &str) -> bool {
        let cell = cell.trim();
        if cell.is_empty() || self.label.is_empty() {
            return false;
        }

        match self.mode {
            LabelMatch::Exact => cell == self.label,
            LabelMatch::CaseInsensitive => cell.to_lowercase() == self.label.to_lowercase(),
            LabelMatch::Token => {
                let label = words(&self.label);
                !label.is_empty()
                    && words(cell)
                        .windows(label.len())
                        .any(|window| window == label.as_slice())
            }
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|ch: char| ch.is_whitespace() || ch.is_ascii_punctuation())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Default for LabelMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL, LabelMatch::Exact)
    }
}

/// Cell-boundary detection method used to pull a grid off page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Columns from the horizontal positions of text runs.
    Positioned,
    /// Columns from whitespace gaps in extracted lines.
    TextGaps,
}

impl ExtractionStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positioned => "positioned",
            Self::TextGaps => "text-gaps",
        }
    }
}

impl Display for ExtractionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positioned" => Ok(Self::Positioned),
            "text-gaps" | "text_gaps" | "text" => Ok(Self::TextGaps),
            other => Err(format!(
                "unknown strategy '{other}', expected positioned or text-gaps"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    pub batch_date: String,
    pub page_policy: PagePolicy,
    pub label: String,
    pub label_match: LabelMatch,
    pub strategies: Vec<ExtractionStrategy>,
}

impl SplitOptions {
    #[must_use]
    pub fn matcher(&self) -> LabelMatcher {
        LabelMatcher::new(self.label.clone(), self.label_match)
    }

    pub(crate) fn validate(&self) -> Result<(), SplitError> {
        if self.label.trim().is_empty() {
            return Err(SplitError::InvalidOption(
                "header label must not be empty".to_string(),
            ));
        }
        if self.strategies.is_empty() {
            return Err(SplitError::InvalidOption(
                "at least one extraction strategy is required".to_string(),
            ));
        }
        validate_batch_date(&self.batch_date)
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            batch_date: FALLBACK_BATCH_DATE.to_string(),
            page_policy: PagePolicy::FullTail,
            label: DEFAULT_LABEL.to_string(),
            label_match: LabelMatch::Exact,
            strategies: vec![ExtractionStrategy::Positioned, ExtractionStrategy::TextGaps],
        }
    }
}

/// Batch date guess from an upload's file name: its first six characters when
/// they are all digits, otherwise `fallback`.
#[must_use]
pub fn default_batch_date(file_name: &str, fallback: &str) -> String {
    let prefix = file_name
        .chars()
        .take(BATCH_DATE_PREFIX_LEN)
        .collect::<String>();
    if !prefix.is_empty() && prefix.chars().all(|ch| ch.is_ascii_digit()) {
        prefix
    } else {
        fallback.to_string()
    }
}

/// The batch date becomes part of archive entry names, so it may not carry
/// path separators or control characters.
pub fn validate_batch_date(value: &str) -> Result<(), SplitError> {
    if value.trim().is_empty() {
        return Err(SplitError::InvalidOption(
            "batch date must not be empty".to_string(),
        ));
    }
    if value
        .chars()
        .any(|ch| matches!(ch, '/' | '\\') || ch.is_control())
    {
        return Err(SplitError::InvalidOption(format!(
            "batch date '{}' contains path separators or control characters",
            value.escape_default()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{
        ExtractionStrategy, LabelMatch, LabelMatcher, PagePolicy, SplitOptions,
        default_batch_date, validate_batch_date,
    };
    use crate::error::SplitError;

    #[test]
    fn parse_page_policy_names() {
        assert_eq!(
            PagePolicy::from_str("fixed-tail").expect("policy should parse"),
            PagePolicy::FixedTail
        );
        assert_eq!(
            PagePolicy::from_str(" FULL_TAIL ").expect("policy should parse"),
            PagePolicy::FullTail
        );
        let err = PagePolicy::from_str("last-two").expect_err("unknown policy should fail");
        assert!(err.contains("unknown page policy"));
    }

    #[test]
    fn fixed_tail_keeps_last_two_pages() {
        assert_eq!(PagePolicy::FixedTail.select_pages(3), vec![2, 3]);
        assert_eq!(PagePolicy::FixedTail.select_pages(7), vec![6, 7]);
    }

    #[test]
    fn full_tail_keeps_everything_after_first_page() {
        assert_eq!(PagePolicy::FullTail.select_pages(5), vec![2, 3, 4, 5]);
        assert!(PagePolicy::FullTail.select_pages(1).is_empty());
    }

    #[test]
    fn page_count_minimums_follow_policy() {
        assert!(PagePolicy::FixedTail.check_page_count(3).is_ok());
        assert!(matches!(
            PagePolicy::FixedTail.check_page_count(2),
            Err(SplitError::TooFewPages {
                required: 3,
                actual: 2,
                ..
            })
        ));
        assert!(PagePolicy::FullTail.check_page_count(1).is_ok());
        assert!(PagePolicy::FullTail.check_page_count(0).is_err());
    }

    #[test]
    fn exact_matcher_is_case_sensitive_and_trims() {
        let matcher = LabelMatcher::default();
        assert!(matcher.matches("  LO "));
        assert!(!matcher.matches("lo"));
        assert!(!matcher.matches("LO Number"));
    }

    #[test]
    fn case_insensitive_matcher_accepts_lowercase() {
        let matcher = LabelMatcher::new("LO", LabelMatch::CaseInsensitive);
        assert!(matcher.matches("lo"));
        assert!(!matcher.matches("LOAN"));
    }

    #[test]
    fn token_matcher_accepts_surrounding_label_text() {
        let matcher = LabelMatcher::new("LO", LabelMatch::Token);
        assert!(matcher.matches("LO Number"));
        assert!(matcher.matches("lo#"));
        assert!(!matcher.matches("LOAN Number"));
    }

    #[test]
    fn token_matcher_accepts_multi_word_label() {
        let matcher = LabelMatcher::new("LO No", LabelMatch::Token);
        assert!(matcher.matches("LO No"));
        assert!(matcher.matches("Refund LO No."));
        assert!(matcher.matches("lo-no"));
        assert!(!matcher.matches("LO Number"));
        assert!(!matcher.matches("No LO"));
    }

    #[test]
    fn batch_date_defaults_from_numeric_file_prefix() {
        assert_eq!(default_batch_date("120125_batch.pdf", "112425"), "120125");
        assert_eq!(default_batch_date("batch_120125.pdf", "112425"), "112425");
        assert_eq!(default_batch_date("12345", "112425"), "12345");
        assert_eq!(default_batch_date("", "112425"), "112425");
    }

    #[test]
    fn batch_date_rejects_path_separators() {
        assert!(validate_batch_date("12-01-25").is_ok());
        assert!(validate_batch_date("12/01/25").is_err());
        assert!(validate_batch_date("  ").is_err());
    }

    #[test]
    fn options_require_label_and_strategy() {
        let options = SplitOptions {
            label: " ".to_string(),
            ..SplitOptions::default()
        };
        assert!(options.validate().is_err());

        let options = SplitOptions {
            strategies: Vec::new(),
            ..SplitOptions::default()
        };
        assert!(options.validate().is_err());

        assert!(SplitOptions::default().validate().is_ok());
        assert_eq!(
            ExtractionStrategy::from_str("text").expect("strategy should parse"),
            ExtractionStrategy::TextGaps
        );
    }
}
