use chrono::NaiveDate;
use thiserror::Error;

/// Failures coming out of a `PocStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A racing insert already holds the unique key.
    #[error("unique constraint violation")]
    UniqueViolation,
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("row decode error: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::UniqueViolation;
            }
        }
        StoreError::Database(e)
    }
}

#[derive(Debug, Error)]
pub enum PocError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{0}")]
    Validation(String),

    #[error("at least one task entry is required")]
    EmptyTaskList,

    #[error("{} duty id(s) do not belong to this plan of care", .0.len())]
    InvalidDutyIds(Vec<String>),

    #[error("unknown completion status {0:?}")]
    InvalidCompletionStatus(String),

    #[error("no active plan of care for individual {individual_id} on {date}")]
    NoActivePoc {
        individual_id: String,
        date: NaiveDate,
    },

    #[error("plan of care {0} not found")]
    PocNotFound(String),

    #[error("daily log {0} not found")]
    DailyLogNotFound(String),

    #[error("daily log {0} is already submitted")]
    AlreadySubmitted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
