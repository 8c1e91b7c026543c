// src/error.rs

//! Unified error handling for race result collection.

use std::fmt;

use thiserror::Error;

/// Result type alias for race result operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Roster file could not be read as CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error (roster, date range, arguments)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure reaching a source site
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Expected structural anchor not found in a fetched document
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// Result layout that is recognized but deliberately not handled
    #[error("Unsupported layout for {context}: {message}")]
    Unsupported { context: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create an unsupported-layout error with context.
    pub fn unsupported(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Unsupported {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error only affects a single candidate.
    ///
    /// Recoverable errors are logged and the candidate skipped; everything
    /// else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Fetch { .. }
                | Self::Json(_)
                | Self::Url(_)
                | Self::Selector { .. }
                | Self::Parse { .. }
                | Self::Unsupported { .. }
        )
    }
}
