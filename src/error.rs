use std::fmt::{Display, Formatter};

use lo_refund_split::{Row, SplitError};
use worker::{Response, Result};

use crate::models::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Parse(String),
    Extraction {
        message: String,
        preview: Option<Vec<Row>>,
    },
    Validation(String),
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Parse(_) => "parse_error",
            Self::Extraction { .. } => "extraction_error",
            Self::Validation(_) => "validation_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Parse(message)
            | Self::Extraction { message, .. }
            | Self::Validation(message)
            | Self::Internal(message) => message,
        }
    }

    pub fn preview(&self) -> Option<&[Row]> {
        match self {
            Self::Extraction { preview, .. } => preview.as_deref(),
            _ => None,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Parse(_) | Self::Extraction { .. } | Self::Validation(_) => 422,
            Self::Internal(_) => 500,
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message().to_string(),
            preview: self.preview().map(<[Row]>::to_vec),
        }
    }

    pub fn into_response(self) -> Result<Response> {
        let mut response = Response::from_json(&self.to_body())?;
        response.headers_mut().set("Cache-Control", "no-store")?;
        Ok(response.with_status(self.status_code()))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<worker::Error> for ApiError {
    fn from(error: worker::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<SplitError> for ApiError {
    fn from(error: SplitError) -> Self {
        let message = error.to_string();
        match error {
            SplitError::InvalidOption(_) => Self::BadRequest(message),
            SplitError::Pdf(_) => Self::Parse(message),
            SplitError::NoTableFound => Self::Extraction {
                message,
                preview: None,
            },
            SplitError::HeaderNotFound { preview, .. } => Self::Extraction {
                message,
                preview: Some(preview),
            },
            SplitError::NoPages
            | SplitError::NoValidRows { .. }
            | SplitError::TooFewPages { .. } => Self::Validation(message),
            SplitError::Io(_)
            | SplitError::Csv(_)
            | SplitError::Archive(_)
            | SplitError::Render(_)
            | SplitError::Assemble(_) => Self::Internal(message),
        }
    }
}
