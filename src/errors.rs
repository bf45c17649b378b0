use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("DUPLICATE_PERIOD: {0}")]
    DuplicatePeriod(String),
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
    #[error("IMPORT_FORMAT: {0}")]
    ImportFormat(String),
    #[error("PERSISTENCE_READ: {0}")]
    PersistenceRead(String),
    #[error("REMOTE_SYNC: {0}")]
    RemoteSync(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
