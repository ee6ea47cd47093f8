use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use sqlx::error::ErrorKind;
use std::sync::Arc;
use thiserror::Error;

use crate::model::prayer::Prayer;

/// Why a check-in was rejected. Every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Failed to fetch prayer schedule")]
    UpstreamFailure(#[source] Arc<ScheduleError>),

    #[error("Failed to load prayer window configuration")]
    ConfigFailure(#[source] anyhow::Error),

    #[error("Check-in is only allowed within the configured prayer windows")]
    NoWindowMatch,

    #[error("Participant already checked in for {0} today")]
    DuplicateCheckIn(Prayer),

    #[error("Failed to save attendance")]
    PersistenceFailure(#[source] anyhow::Error),
}

impl ResponseError for CheckInError {
    fn status_code(&self) -> StatusCode {
        match self {
            CheckInError::InvalidInput(_)
            | CheckInError::NoWindowMatch
            | CheckInError::DuplicateCheckIn(_) => StatusCode::BAD_REQUEST,
            CheckInError::NotFound(_) => StatusCode::NOT_FOUND,
            CheckInError::UpstreamFailure(_)
            | CheckInError::ConfigFailure(_)
            | CheckInError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Failure talking to the prayer schedule provider.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("schedule provider answered with status {0}")]
    Status(u16),

    #[error("failed to decode schedule response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure of a ledger write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the row.
    #[error("duplicate entry")]
    Duplicate,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// True only for unique-key violations. MySQL reports foreign-key and NOT NULL
/// failures under the same SQLSTATE 23000, so the code alone is not enough.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => matches!(db_err.kind(), ErrorKind::UniqueViolation),
        _ => false,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation(&e) {
            return StoreError::Duplicate;
        }
        StoreError::Other(e.into())
    }
}

/// Failure resolving a device to its locality code.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{0}")]
    Missing(&'static str),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
