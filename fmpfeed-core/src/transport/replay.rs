//! In-memory transport replaying scripted responses.
//!
//! Responses are served in the order they were queued, one per request, and
//! every request is recorded. Bodies are tracked while open so callers can
//! check that each one was released.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{HttpTransport, Query, ResponseHandle};
use crate::error::FetchError;

/// One request as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
pub struct ReplayTransport {
    responses: Mutex<VecDeque<(u16, Vec<u8>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    open_bodies: Arc<AtomicUsize>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn respond(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push(status, body);
        self
    }

    pub fn push(&self, status: u16, body: impl Into<Vec<u8>>) {
        guard(&self.responses).push_back((status, body.into()));
    }

    /// Queue a 200 response whose body is read from `path`.
    pub fn push_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let body = std::fs::read(path)?;
        self.push(200, body);
        Ok(())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        guard(&self.requests).clone()
    }

    /// Scripted responses not served yet.
    pub fn pending(&self) -> usize {
        guard(&self.responses).len()
    }

    /// Bodies handed out and not dropped yet.
    pub fn open_bodies(&self) -> usize {
        self.open_bodies.load(Ordering::SeqCst)
    }
}

impl HttpTransport for ReplayTransport {
    fn issue_get(&self, path: &str, query: &Query) -> Result<ResponseHandle, FetchError> {
        guard(&self.requests).push(RecordedRequest {
            path: path.to_string(),
            query: query.to_vec(),
        });
        let (status, body) = guard(&self.responses)
            .pop_front()
            .ok_or_else(|| FetchError::transport(path, "no scripted response left"))?;
        tracing::debug!(path, status, "request issued");
        self.open_bodies.fetch_add(1, Ordering::SeqCst);
        let body = TrackedBody {
            inner: Cursor::new(body),
            open: Arc::clone(&self.open_bodies),
        };
        Ok(ResponseHandle::new(status, body))
    }
}

struct TrackedBody {
    inner: Cursor<Vec<u8>>,
    open: Arc<AtomicUsize>,
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
