use crate::options::ExtractionStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    StrategyFallback,
    HeaderMissingInStrategy,
    GroupFailed,
}

impl WarningCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrategyFallback => "strategy_fallback",
            Self::HeaderMissingInStrategy => "header_missing_in_strategy",
            Self::GroupFailed => "group_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitWarning {
    pub code: WarningCode,
    pub message: String,
    pub identifier: Option<String>,
    pub strategy: Option<ExtractionStrategy>,
}

impl SplitWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            identifier: None,
            strategy: None,
        }
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ExtractionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}
