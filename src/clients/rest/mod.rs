//! REST client for resource-mapped APIs.
//!
//! [`RestClient`] sits on top of a [`Transport`](crate::clients::Transport)
//! (the [`HttpClient`](crate::clients::HttpClient) in production, a
//! [`MockTransport`](crate::clients::MockTransport) in tests) and is the
//! entry point of the resource layer in [`crate::rest`].
//!
//! # Example
//!
//! ```rust,ignore
//! use restmap::RestClient;
//!
//! let client = RestClient::new(&config, registry)?;
//!
//! // Raw verbs return the response whatever its status
//! let response = client.get("/v1/playlists", Vec::new()).await?;
//! println!("{}", response.body);
//!
//! // Resource-level access maps statuses to errors
//! let playlist = client.find("playlist", "p1", None).await?;
//! ```
//!
//! # Retry Behavior
//!
//! GET requests are attempted up to `max_tries` times on 429 and 5xx
//! responses. Writes are attempted once.

mod client;

pub use client::RestClient;
