use thiserror::Error;

#[derive(Error, Debug)]
pub enum TmsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Account history error: {0}")]
    History(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TmsResult<T> = Result<T, TmsError>;
