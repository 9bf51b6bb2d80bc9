use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No row matched: the alert is gone, not owned by the caller, or a
    /// `require_active` update found it already inactive.
    #[error("alert not found or no longer active")]
    NotFoundOrStale,

    #[error("store error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("directory error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for DirectoryError {
    fn from(e: mongodb::error::Error) -> Self {
        DirectoryError::Backend(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("failed to load active alerts: {0}")]
    Load(String),
}

/// Request-level failures, mapped to status codes by the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("{0}")]
    Invalid(String),

    #[error("Alert not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for AlertError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFoundOrStale => AlertError::NotFound,
            StoreError::Backend(msg) => AlertError::Store(msg),
        }
    }
}
