use std::io;

use thiserror::Error;

/// Library-wide error type for agsync operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A date, time, duration or timezone string could not be understood.
    #[error("{0}")]
    Format(String),

    /// The project config violates the schema or one of its invariants.
    #[error("{0}")]
    Config(String),

    /// A course or project lookup came back empty.
    #[error("{0}")]
    NotFound(String),

    /// The grading service answered with a non-2xx status.
    #[error("Request failed with status {status}: {body}")]
    RemoteRequest { status: u16, body: String },

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The response body did not match the expected shape.
    #[error("Unexpected response from {url}: {details}")]
    InvalidResponse { url: String, details: String },

    /// No API token file could be located.
    #[error("Requested token file: {0} not found")]
    TokenFileNotFound(String),

    /// Embedded assets or templates are broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        AppError::Config(message.into())
    }

    pub fn format_error<S: Into<String>>(message: S) -> Self {
        AppError::Format(message.into())
    }

    /// Provide an `io::ErrorKind`-like view for callers mapping errors to exit behavior.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            AppError::Io(err) => err.kind(),
            AppError::Format(_) | AppError::Config(_) => io::ErrorKind::InvalidInput,
            AppError::NotFound(_) | AppError::TokenFileNotFound(_) => io::ErrorKind::NotFound,
            AppError::RemoteRequest { .. } | AppError::Http(_) => io::ErrorKind::Other,
            AppError::InvalidResponse { .. } => io::ErrorKind::InvalidData,
            AppError::Internal(_) => io::ErrorKind::Other,
        }
    }
}
