//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use base64::Engine;
use std::fmt;

/// A validated API root URL (`scheme://authority[/base]`).
///
/// The root URL is prepended to every resolved resource path. Trailing
/// slashes are stripped so that `https://api.example.com/` and
/// `https://api.example.com` produce identical request URLs.
///
/// # Example
///
/// ```rust
/// use restmap::RootUrl;
///
/// let url = RootUrl::new("https://api.example.com/").unwrap();
/// assert_eq!(url.as_ref(), "https://api.example.com");
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.host_name(), Some("api.example.com"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
}

impl RootUrl {
    /// Creates a new validated root URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRootUrl`] if the URL has no scheme or host,
    /// or carries a query string or fragment.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();
        let invalid = || ConfigError::InvalidRootUrl { url: url.clone() };

        let scheme_end = url.find("://").ok_or_else(invalid)?;

        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let host_start = scheme_end + 3;
        if host_start >= url.len() {
            return Err(invalid());
        }

        if url[host_start..].contains(['?', '#']) {
            return Err(invalid());
        }

        let remainder = &url[host_start..];
        let host_end = remainder
            .find([':', '/'])
            .map_or(url.len(), |i| host_start + i);

        if host_end == host_start {
            return Err(invalid());
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        let host = &self.url[self.host_start..self.host_end];
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }

    /// Joins a resolved resource path onto this root.
    ///
    /// ```rust
    /// use restmap::RootUrl;
    ///
    /// let url = RootUrl::new("https://api.example.com").unwrap();
    /// assert_eq!(url.join("/v1/songs"), "https://api.example.com/v1/songs");
    /// assert_eq!(url.join("v1/songs"), "https://api.example.com/v1/songs");
    /// ```
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.url)
        } else {
            format!("{}/{path}", self.url)
        }
    }
}

impl AsRef<str> for RootUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

/// Credentials for HTTP basic authentication.
///
/// The password is masked in debug output to prevent accidental exposure
/// in logs.
///
/// # Example
///
/// ```rust
/// use restmap::BasicAuth;
///
/// let auth = BasicAuth::new("me", "p@$$w0rd").unwrap();
/// assert_eq!(auth.username(), "me");
/// assert_eq!(format!("{:?}", auth), r#"BasicAuth { username: "me", password: ***** }"#);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Creates new basic auth credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyUsername`] if the user name is empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let username = username.into();
        if username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        Ok(Self {
            username,
            password: password.into(),
        })
    }

    /// Returns the user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the value for the `Authorization` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BasicAuth {{ username: {:?}, password: ***** }}",
            self.username
        )
    }
}
