use actix_web::{body, http::{self, StatusCode}, HttpResponse};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayrollError {
    /// Missing or malformed input, the message names the field
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    /// The request contradicts the record's current state
    #[error("{0}")]
    Conflict(String),
    #[error("database error")]
    Database(#[from] DbErr),
}

pub type PayrollResult<T> = Result<T, PayrollError>;

impl PayrollError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

/// Outcome of one item of a batch operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BatchItemResult {
    pub fn succeeded(id: impl ToString) -> Self {
        Self { id: id.to_string(), success: true, message: None }
    }

    pub fn failed(id: impl ToString, err: &PayrollError) -> Self {
        Self { id: id.to_string(), success: false, message: Some(err.to_string()) }
    }
}

/// Failure body of the `{success, data?, message?, error?}` envelope
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl actix_web::error::ResponseError for PayrollError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        let (message, error) = match self {
            PayrollError::Database(err) => ("Server error".to_string(), Some(err.to_string())),
            other => (other.to_string(), None),
        };

        HttpResponse::build(self.status_code())
            .json(ErrorBody { success: false, message, error })
    }

    fn status_code(&self) -> http::StatusCode {
        match self {
            PayrollError::Validation(_) => StatusCode::BAD_REQUEST,
            PayrollError::NotFound(_) => StatusCode::NOT_FOUND,
            PayrollError::Forbidden(_) => StatusCode::FORBIDDEN,
            PayrollError::Conflict(_) => StatusCode::BAD_REQUEST,
            PayrollError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
