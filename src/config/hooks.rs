//! Request and response hooks.
//!
//! Hooks run inside [`HttpClient`](crate::clients::HttpClient) around every
//! attempt sent on the wire. Before-request hooks see the method and full
//! URL and may edit the outgoing headers. After-response hooks see every
//! received response, including 4xx and 5xx statuses. Neither runs when the
//! request fails before a response arrives.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::clients::{HttpMethod, HttpResponse};

/// Called before each attempt with the method, the full URL and the headers
/// about to be sent.
pub type BeforeRequestHook =
    Arc<dyn Fn(HttpMethod, &str, &mut HashMap<String, String>) + Send + Sync>;

/// Called with each received response.
pub type AfterResponseHook = Arc<dyn Fn(&HttpResponse) + Send + Sync>;

/// Ordered hook lists shared by every request of a client.
#[derive(Clone, Default)]
pub struct RequestHooks {
    before: Vec<BeforeRequestHook>,
    after: Vec<AfterResponseHook>,
}

impl fmt::Debug for RequestHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

impl RequestHooks {
    pub(crate) fn push_before(&mut self, hook: BeforeRequestHook) {
        self.before.push(hook);
    }

    pub(crate) fn push_after(&mut self, hook: AfterResponseHook) {
        self.after.push(hook);
    }

    /// Returns `true` if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Runs the before-request hooks in registration order.
    pub fn before_request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &mut HashMap<String, String>,
    ) {
        for hook in &self.before {
            hook(method, url, &mut *headers);
        }
    }

    /// Runs the after-response hooks in registration order.
    pub fn after_response(&self, response: &HttpResponse) {
        for hook in &self.after {
            hook(response);
        }
    }
}
