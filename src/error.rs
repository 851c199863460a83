use serde::Serialize;
use thiserror::Error;

/// Application error types for better error handling and user feedback.
#[derive(Debug, Clone, Serialize, Error, PartialEq, Eq)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Errors related to local file storage
    #[error("Storage error: {0}")]
    Storage(String),
    /// A reminder or list id that the store does not hold
    #[error("Not found: {0}")]
    NotFound(String),
    /// Errors related to data validation
    #[error("Validation error: {0}")]
    Validation(String),
    /// Errors raised by the timer service
    #[error("Scheduling error: {0}")]
    Scheduling(String),
    /// Errors raised while rendering a notification
    #[error("Notification error: {0}")]
    Notification(String),
    /// Errors related to custom sound downloads
    #[error("Download error: {0}")]
    Download(String),
    /// Errors related to network operations
    #[error("Network error: {0}")]
    Network(String),
}

// Conversion to String for Tauri command return types
impl From<AppError> for String {
    fn from(error: AppError) -> Self {
        error.to_string()
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

// Convenience constructors
impl AppError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn scheduling<S: Into<String>>(msg: S) -> Self {
        AppError::Scheduling(msg.into())
    }

    pub fn notification<S: Into<String>>(msg: S) -> Self {
        AppError::Notification(msg.into())
    }

    pub fn download<S: Into<String>>(msg: S) -> Self {
        AppError::Download(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        AppError::Network(msg.into())
    }
}

/// Result type alias for commands
pub type AppResult<T> = Result<T, AppError>;
