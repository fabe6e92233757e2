//! Error types for client configuration.
//!
//! This module contains the error type produced while building a
//! [`ClientConfig`](crate::ClientConfig) and its validated newtypes.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use restmap::{ConfigError, RootUrl};
//!
//! let result = RootUrl::new("");
//! assert!(matches!(result, Err(ConfigError::InvalidRootUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur during client configuration.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The root URL is invalid.
    #[error("Invalid root URL '{url}'. Please provide a URL with scheme (e.g., 'https://api.example.com').")]
    InvalidRootUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Basic auth user name cannot be empty.
    #[error("Basic auth user name cannot be empty.")]
    EmptyUsername,

    /// A header name or value is invalid.
    #[error("Invalid header '{name}'. Header names must be non-empty and contain no whitespace.")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// The retry count must allow at least one attempt.
    #[error("Invalid max_tries {tries}. At least one attempt is required.")]
    InvalidMaxTries {
        /// The invalid value that was provided.
        tries: u32,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },
}
