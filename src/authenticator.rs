//! Authentication hook
//!
//! The authenticator resolves a request to a current user, nothing more: it
//! never rejects a request. Returning `None` means the user is
//! unrecognized; connectors then adapt their behavior based on
//! `RequestContext::current_user`.

use async_trait::async_trait;
use http::{HeaderMap, Method, Uri};

/// Immutable request information handed to the authenticator
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// HTTP method of the request
    pub method: Method,
    /// Full request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
}

/// Resolves a request to a current user
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Identify the user behind the request, or `None` when unrecognized
    async fn authenticate(&self, request: &RequestInfo) -> Option<String>;
}

/// Authenticator that recognizes nobody
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuthenticator;

#[async_trait]
impl Authenticator for NullAuthenticator {
    async fn authenticate(&self, _request: &RequestInfo) -> Option<String> {
        None
    }
}
