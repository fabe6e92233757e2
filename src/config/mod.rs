//! Configuration types for the resource-mapping client.
//!
//! This module provides the configuration shared by every resource type bound
//! to a [`RestClient`](crate::RestClient).
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ClientConfig`]: The configuration struct holding all client settings
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`RootUrl`]: A validated `scheme://authority` root for all request paths
//! - [`BasicAuth`]: Basic auth credentials with masked debug output
//! - [`RequestHooks`]: Callbacks run around every request attempt
//!
//! # Example
//!
//! ```rust
//! use restmap::{ClientConfig, RootUrl};
//!
//! let config = ClientConfig::builder()
//!     .root_url(RootUrl::new("https://api.example.com").unwrap())
//!     .client_agent("example-client/1.0")
//!     .header("Accept-Type", "application/json")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.user_agent_header(), Some("example-client/1.0".to_string()));
//! ```

mod hooks;
mod newtypes;

pub use hooks::{AfterResponseHook, BeforeRequestHook, RequestHooks};
pub use newtypes::{BasicAuth, RootUrl};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::{HttpMethod, HttpResponse};

use crate::error::ConfigError;
use crate::rest::PageFormat;

/// Configuration for a resource-mapping client.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
///
/// # Example
///
/// ```rust
/// use restmap::{BasicAuth, ClientConfig, RootUrl};
///
/// let config = ClientConfig::builder()
///     .root_url(RootUrl::new("https://api.example.com").unwrap())
///     .auth(BasicAuth::new("me", "secret").unwrap())
///     .max_tries(3)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.max_tries(), 3);
/// assert!(!config.allow_redirects());
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    root_url: RootUrl,
    client_agent: Option<String>,
    user_agent: Option<String>,
    auth: Option<BasicAuth>,
    headers: HashMap<String, String>,
    allow_redirects: bool,
    timeout: Option<Duration>,
    max_tries: u32,
    echo: bool,
    page_format: PageFormat,
    hooks: RequestHooks,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the root URL.
    #[must_use]
    pub const fn root_url(&self) -> &RootUrl {
        &self.root_url
    }

    /// Returns the client agent (e.g. `example-client/1.2`), if configured.
    #[must_use]
    pub fn client_agent(&self) -> Option<&str> {
        self.client_agent.as_deref()
    }

    /// Returns the user agent of the consumer of this client, if configured.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the `User-Agent` header value: the client agent followed by
    /// the consumer's user agent, space separated.
    #[must_use]
    pub fn user_agent_header(&self) -> Option<String> {
        let parts: Vec<&str> = [self.client_agent(), self.user_agent()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Returns the basic auth credentials, if configured.
    #[must_use]
    pub const fn auth(&self) -> Option<&BasicAuth> {
        self.auth.as_ref()
    }

    /// Returns the headers included in every request.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Returns whether server redirects are followed.
    #[must_use]
    pub const fn allow_redirects(&self) -> bool {
        self.allow_redirects
    }

    /// Returns the per-request timeout, if configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the number of attempts made for retryable responses (429/5xx).
    #[must_use]
    pub const fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Returns whether request and response information is echoed at `info` level.
    #[must_use]
    pub const fn echo(&self) -> bool {
        self.echo
    }

    /// Returns the page decoding conventions of the API.
    #[must_use]
    pub const fn page_format(&self) -> &PageFormat {
        &self.page_format
    }

    /// Returns the request and response hooks.
    #[must_use]
    pub const fn hooks(&self) -> &RequestHooks {
        &self.hooks
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// The only required field is `root_url`.
///
/// # Defaults
///
/// - `client_agent`, `user_agent`, `auth`, `timeout`: `None`
/// - `headers`: Empty
/// - `allow_redirects`: `false`
/// - `max_tries`: `1` (no retries)
/// - `echo`: `false`
/// - `page_format`: [`PageFormat::default`]
/// - hooks: None
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    root_url: Option<RootUrl>,
    client_agent: Option<String>,
    user_agent: Option<String>,
    auth: Option<BasicAuth>,
    headers: HashMap<String, String>,
    allow_redirects: Option<bool>,
    timeout: Option<Duration>,
    max_tries: Option<u32>,
    echo: Option<bool>,
    page_format: Option<PageFormat>,
    hooks: RequestHooks,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root URL (required).
    #[must_use]
    pub fn root_url(mut self, root_url: RootUrl) -> Self {
        self.root_url = Some(root_url);
        self
    }

    /// Sets the client agent (the name/version of the client library built on this crate).
    #[must_use]
    pub fn client_agent(mut self, agent: impl Into<String>) -> Self {
        self.client_agent = Some(agent.into());
        self
    }

    /// Sets the consumer's user agent.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Sets basic auth credentials.
    #[must_use]
    pub fn auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets whether server redirects are followed.
    #[must_use]
    pub const fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = Some(allow);
        self
    }

    /// Sets the per-request timeout. Timeouts surface as transport errors.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the number of attempts for retryable responses (429/5xx).
    #[must_use]
    pub const fn max_tries(mut self, tries: u32) -> Self {
        self.max_tries = Some(tries);
        self
    }

    /// Echo requests and responses at `info` level instead of `debug`.
    #[must_use]
    pub const fn echo(mut self, echo: bool) -> Self {
        self.echo = Some(echo);
        self
    }

    /// Sets the page decoding conventions.
    #[must_use]
    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.page_format = Some(format);
        self
    }

    /// Adds a hook run before every attempt. It receives the method, the
    /// full URL and the outgoing headers, which it may modify.
    #[must_use]
    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(HttpMethod, &str, &mut HashMap<String, String>) + Send + Sync + 'static,
    {
        self.hooks.push_before(Arc::new(hook));
        self
    }

    /// Adds a hook run with every received response, whatever its status.
    #[must_use]
    pub fn after_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HttpResponse) + Send + Sync + 'static,
    {
        self.hooks.push_after(Arc::new(hook));
        self
    }

    /// Builds the [`ClientConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `root_url` is not set,
    /// [`ConfigError::InvalidHeader`] for an empty or whitespace-bearing header
    /// name and [`ConfigError::InvalidMaxTries`] for a zero retry count.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let root_url = self
            .root_url
            .ok_or(ConfigError::MissingRequiredField { field: "root_url" })?;

        if let Some(name) = self
            .headers
            .keys()
            .find(|name| name.is_empty() || name.chars().any(char::is_whitespace))
        {
            return Err(ConfigError::InvalidHeader { name: name.clone() });
        }

        let max_tries = self.max_tries.unwrap_or(1);
        if max_tries == 0 {
            return Err(ConfigError::InvalidMaxTries { tries: max_tries });
        }

        Ok(ClientConfig {
            root_url,
            client_agent: self.client_agent,
            user_agent: self.user_agent,
            auth: self.auth,
            headers: self.headers,
            allow_redirects: self.allow_redirects.unwrap_or(false),
            timeout: self.timeout,
            max_tries,
            echo: self.echo.unwrap_or(false),
            page_format: self.page_format.unwrap_or_default(),
            hooks: self.hooks,
        })
    }
}
