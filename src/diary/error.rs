//! Diary error types.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::FoodId;

/// Errors that can occur during diary operations.
#[derive(Debug, Error)]
pub enum DiaryError {
    /// The entry store rejected a query or write
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A stored record could not be decoded
    #[error("Corrupt diary record: {0}")]
    CorruptRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The foods catalog failed to answer
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Food not found in catalog: {0}")]
    UnknownFood(FoodId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The item at `index` is not the one the caller saw
    #[error("Item at index {index} changed (expected {expected}, found {found})")]
    StaleIndex {
        index: usize,
        expected: Uuid,
        found: Uuid,
    },

    /// A second entry for an already logged day
    #[error("A diary entry for {0} already exists")]
    DuplicateEntry(NaiveDate),
}

pub type DiaryResult<T> = Result<T, DiaryError>;
