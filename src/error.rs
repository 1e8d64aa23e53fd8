// src/error.rs

//! Unified error handling for the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Hint printed alongside every authentication failure.
pub const AUTH_HINT: &str =
    "re-run the token refresh flow and update refresh_token in the credentials file";

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// SQLite store error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The forum rejected our credentials
    #[error("Authentication failed: {message} ({hint})", hint = AUTH_HINT)]
    Auth { message: String },

    /// The forum kept answering 429 after all retries
    #[error("Rate limited by the forum API at {context}")]
    RateLimited { context: String },

    /// Non-success status returned by the forum API
    #[error("API error {status} at {context}")]
    Api { status: u16, context: String },

    /// Comment tree could not be expanded in full
    #[error("Comment tree for {post_id} is too large to expand")]
    TooLarge { post_id: String },

    /// A stage input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// A stage input file exists but cannot be used
    #[error("Corrupt input file {}: {message}", .path.display())]
    CorruptInput { path: PathBuf, message: String },

    /// Chart rendering failed
    #[error("Chart error: {0}")]
    Chart(String),

    /// Crawling error
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an API status error with context.
    pub fn api(status: u16, context: impl Into<String>) -> Self {
        Self::Api {
            status,
            context: context.into(),
        }
    }

    /// Create a corrupt input error.
    pub fn corrupt(path: &Path, message: impl fmt::Display) -> Self {
        Self::CorruptInput {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a chart rendering error.
    pub fn chart(message: impl fmt::Display) -> Self {
        Self::Chart(message.to_string())
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_carries_hint() {
        let err = AppError::auth("invalid_grant");
        assert!(err.is_auth());
        assert!(err.to_string().contains("refresh_token"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(AppError::api(503, "listing").is_transient());
        assert!(AppError::api(429, "listing").is_transient());
        assert!(!AppError::api(404, "listing").is_transient());
        assert!(!AppError::validation("bad").is_transient());
    }
}
