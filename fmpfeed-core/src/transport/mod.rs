//! The transport seam: issue a GET, get back a status and a byte stream.
//!
//! The core never builds URLs, injects credentials or retries; that is the
//! transport's business. [`HttpClientTransport`] talks to the real service,
//! [`ReplayTransport`] serves scripted responses for tests and fixtures.

pub mod circuit_breaker;
pub mod http;
pub mod replay;

use std::fmt;
use std::io::Read;

use crate::decode::Body;
use crate::error::FetchError;

pub use self::circuit_breaker::CircuitBreaker;
pub use self::http::HttpClientTransport;
pub use self::replay::{RecordedRequest, ReplayTransport};

/// Query parameters in request order.
pub type Query = [(String, String)];

/// Issues GET requests against the remote service.
pub trait HttpTransport: Send + Sync {
    /// Issue the request and return as soon as the status is known.
    ///
    /// The body is not read here; it is streamed by whoever consumes the handle.
    fn issue_get(&self, path: &str, query: &Query) -> Result<ResponseHandle, FetchError>;
}

/// A response whose body has not been read yet.
pub struct ResponseHandle {
    status: u16,
    body: Body,
}

impl ResponseHandle {
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Take the body as a byte stream. Dropping it releases the connection.
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Release the connection without reading the body.
    pub fn release(self) {
        drop(self.body);
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
