// src/error.rs

//! Unified error handling for the importer.

use std::fmt;

use thiserror::Error;

/// Result type alias for importer operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a single organization could not be fetched.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The organization no longer exists on the source site
    #[error("organization {symbol} not found on source")]
    NotFound { symbol: String },

    /// Network, HTTP, throttling or markup failure; the next run retries
    #[error("transient fetch failure for {context}: {message}")]
    Transient { context: String, message: String },
}

impl FetchError {
    /// Create a not-found error for a symbol.
    pub fn not_found(symbol: impl Into<String>) -> Self {
        Self::NotFound {
            symbol: symbol.into(),
        }
    }

    /// Create a transient error with context.
    pub fn transient(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transient {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound { .. } => "not_found",
            FetchError::Transient { .. } => "transient",
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// SQLite read or write failed
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unrecoverable startup failure, e.g. the store cannot be opened
    #[error("Setup error: {0}")]
    Setup(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a setup error.
    pub fn setup(message: impl fmt::Display) -> Self {
        Self::Setup(message.to_string())
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Io(_) => "io",
            AppError::Http(_) => "http",
            AppError::Toml(_) => "toml",
            AppError::Url(_) => "url",
            AppError::Storage(_) => "storage",
            AppError::Selector { .. } => "selector",
            AppError::Validation(_) => "validation",
            AppError::Setup(_) => "setup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_kinds() {
        assert_eq!(FetchError::not_found("ORG2").kind(), "not_found");
        assert_eq!(FetchError::transient("ORG3", "timeout").kind(), "transient");
    }

    #[test]
    fn fetch_error_message_carries_symbol() {
        let err = FetchError::not_found("ORG2");
        assert_eq!(err.to_string(), "organization ORG2 not found on source");
    }

    #[test]
    fn setup_error_kind() {
        let err = AppError::setup("cannot open store data/organizations.db");
        assert_eq!(err.kind(), "setup");
        assert_eq!(
            err.to_string(),
            "Setup error: cannot open store data/organizations.db"
        );
    }
}
