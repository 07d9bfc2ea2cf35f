use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Trade not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("CSV error: {0}")]
    Csv(String),
}

pub type Result<T> = std::result::Result<T, JournalError>;

impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => {
                JournalError::NotFound("no matching row".to_string())
            }
            other => JournalError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for JournalError {
    fn from(err: csv::Error) -> Self {
        JournalError::Csv(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for JournalError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        JournalError::Database(format!("Connection lock poisoned: {}", err))
    }
}
