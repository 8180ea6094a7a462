use thiserror::Error;

/// Error taxonomy for the estimation store.
///
/// Validation failures carry the offending field and are raised before any
/// mutation; not-found covers unknown ids as well as ids owned by another
/// tenant; database errors abort (and roll back) the in-flight operation.
#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("timestamp format error: {0}")]
    TimeFormat(#[from] time::error::Format),

    #[error("timestamp parse error: {0}")]
    TimeParse(#[from] time::error::Parse),
}

impl EstimateError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EstimateError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: &'static str) -> Self {
        EstimateError::NotFound { what }
    }
}

pub type Result<T> = std::result::Result<T, EstimateError>;
