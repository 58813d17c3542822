//! DataRetrievalPipeline: one lazy record stream per logical call.
//!
//! A [`RecordStream`] owns everything one call needs: the transport handle,
//! the paging plan, the decoder of the page being read and the failure
//! policy. Pages are requested one at a time, only when the previous page is
//! exhausted. Records come out in wire order.
//!
//! Validation failures are the only recoverable errors. Under
//! [`FailurePolicy::FailFast`] the first one ends the stream; under
//! [`FailurePolicy::Collect`] it is handed to the sink and the record is
//! skipped. Transport and protocol errors always end the stream.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::decode::{self, RecordDecoder, WireFormat};
use crate::error::FetchError;
use crate::mapper::Payload;
use crate::paginate::{CalendarPaginator, DiagnosticSink};
use crate::scheduler::suspend;
use crate::transport::HttpTransport;
use crate::validate::ValidationFailure;

/// HTTP 400 on a multi-part endpoint: there is no such part.
const NO_MORE_PARTS: u16 = 400;

/// Receives validation failures under collect-and-continue.
pub trait FailureSink: Send + Sync {
    fn report(&self, failure: ValidationFailure);
}

impl<F> FailureSink for F
where
    F: Fn(ValidationFailure) + Send + Sync,
{
    fn report(&self, failure: ValidationFailure) {
        self(failure)
    }
}

/// Keeps every reported failure in memory.
#[derive(Debug, Default)]
pub struct FailureLog {
    failures: Mutex<Vec<ValidationFailure>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<ValidationFailure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn failures(&self) -> Vec<ValidationFailure> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<ValidationFailure> {
        std::mem::take(&mut *self.guard())
    }
}

impl FailureSink for FailureLog {
    fn report(&self, failure: ValidationFailure) {
        self.guard().push(failure);
    }
}

/// Drops failures; the stream still logs each one at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreFailures;

impl FailureSink for IgnoreFailures {
    fn report(&self, _failure: ValidationFailure) {}
}

#[derive(Clone, Default)]
pub enum FailurePolicy {
    #[default]
    FailFast,
    Collect(Arc<dyn FailureSink>),
}

impl FailurePolicy {
    pub fn collect(sink: impl FailureSink + 'static) -> Self {
        FailurePolicy::Collect(Arc::new(sink))
    }

    pub fn is_fail_fast(&self) -> bool {
        matches!(self, FailurePolicy::FailFast)
    }
}

impl fmt::Debug for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => f.write_str("FailFast"),
            FailurePolicy::Collect(_) => f.write_str("Collect(..)"),
        }
    }
}

/// How one logical call maps onto requests.
#[derive(Debug, Clone)]
pub enum Paging {
    /// Exactly one request.
    Single,
    /// Date windows stepped by the paginator; `from`/`to` are added to the query.
    Calendar(CalendarPaginator),
    /// `part=0,1,..` until the service answers 400. Reaching `limit` is an error.
    Parts { limit: u32 },
}

enum Plan {
    Single { issued: bool },
    Calendar(CalendarPaginator),
    Parts { next: u32, limit: u32 },
}

struct Page {
    decoder: RecordDecoder,
    decoded: usize,
    last_date: Option<NaiveDate>,
}

/// A lazy sequence of `P` records for one call.
///
/// Dropping the stream early drops the open page and releases its body.
pub struct RecordStream<P> {
    transport: Arc<dyn HttpTransport>,
    path: String,
    format: WireFormat,
    query: Vec<(String, String)>,
    plan: Plan,
    policy: FailurePolicy,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
    page: Option<Page>,
    finished: bool,
    pages_requested: usize,
    _payload: PhantomData<fn() -> P>,
}

impl<P: Payload> RecordStream<P> {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        path: impl Into<String>,
        format: WireFormat,
        query: Vec<(String, String)>,
        paging: Paging,
    ) -> Self {
        let plan = match paging {
            Paging::Single => Plan::Single { issued: false },
            Paging::Calendar(paginator) => Plan::Calendar(paginator),
            Paging::Parts { limit } => Plan::Parts { next: 0, limit },
        };
        Self {
            transport,
            path: path.into(),
            format,
            query,
            plan,
            policy: FailurePolicy::FailFast,
            diagnostics: None,
            page: None,
            finished: false,
            pages_requested: 0,
            _payload: PhantomData,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Option<Arc<dyn DiagnosticSink>>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pages_requested(&self) -> usize {
        self.pages_requested
    }

    /// True once no further record or request will be produced.
    pub fn is_finished(&self) -> bool {
        self.finished && self.page.is_none()
    }

    fn next_query(&mut self) -> Result<Option<Vec<(String, String)>>, FetchError> {
        let mut query = self.query.clone();
        match &mut self.plan {
            Plan::Single { issued: true } => return Ok(None),
            Plan::Single { issued } => *issued = true,
            Plan::Calendar(paginator) => {
                let window = paginator.window();
                query.push(("from".into(), window.from.format("%Y-%m-%d").to_string()));
                query.push(("to".into(), window.to.format("%Y-%m-%d").to_string()));
            }
            Plan::Parts { next, limit } => {
                if *next >= *limit {
                    return Err(FetchError::PartLimitExceeded {
                        endpoint: self.path.clone(),
                        limit: *limit,
                    });
                }
                query.push(("part".into(), next.to_string()));
                *next += 1;
            }
        }
        Ok(Some(query))
    }

    /// Issue the next request if no page is open.
    ///
    /// Returns whether a page is open afterwards. Only the request is issued
    /// here; the body is not read until records are pulled.
    pub fn open_page(&mut self) -> Result<bool, FetchError> {
        if self.page.is_some() {
            return Ok(true);
        }
        if self.finished {
            return Ok(false);
        }
        let result = self.issue();
        if !matches!(result, Ok(true)) {
            self.finished = true;
        }
        result
    }

    fn issue(&mut self) -> Result<bool, FetchError> {
        let Some(query) = self.next_query()? else {
            return Ok(false);
        };
        tracing::debug!(endpoint = %self.path, ?query, "requesting page");
        let response = self.transport.issue_get(&self.path, &query)?;
        self.pages_requested += 1;

        let status = response.status_code();
        if !response.is_success() {
            response.release();
            if status == NO_MORE_PARTS && matches!(self.plan, Plan::Parts { .. }) {
                tracing::debug!(endpoint = %self.path, "no more parts");
                return Ok(false);
            }
            return Err(FetchError::UnexpectedStatus {
                endpoint: self.path.clone(),
                status,
            });
        }

        self.page = Some(Page {
            decoder: decode::decode(response.into_body(), self.format, &self.path),
            decoded: 0,
            last_date: None,
        });
        Ok(true)
    }

    fn close_page(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        tracing::debug!(
            endpoint = %self.path,
            decoded = page.decoded,
            last_date = ?page.last_date,
            "page closed"
        );
        match &mut self.plan {
            Plan::Single { .. } => self.finished = true,
            Plan::Calendar(paginator) => {
                let more = paginator.advance(page.decoded, page.last_date, self.diagnostics.as_deref());
                if !more {
                    self.finished = true;
                }
            }
            Plan::Parts { .. } => {}
        }
    }

    fn abort(&mut self) {
        self.page = None;
        self.finished = true;
    }

    /// Next record of the open page, or `None` once the page is exhausted.
    pub fn next_in_page(&mut self) -> Option<Result<P, FetchError>> {
        let mode = self.format.validation_mode();
        loop {
            let page = self.page.as_mut()?;
            match page.decoder.next() {
                Some(Ok(raw)) => {
                    page.decoded += 1;
                    match P::from_raw(&raw, mode) {
                        Ok(record) => {
                            if let Some(date) = record.calendar_date() {
                                page.last_date = Some(date);
                            }
                            return Some(Ok(record));
                        }
                        Err(failure) => match &self.policy {
                            FailurePolicy::FailFast => {
                                self.abort();
                                return Some(Err(FetchError::Validation(failure)));
                            }
                            FailurePolicy::Collect(sink) => {
                                tracing::warn!(endpoint = %self.path, %failure, "skipping invalid record");
                                sink.report(failure);
                            }
                        },
                    }
                }
                Some(Err(e)) => {
                    self.abort();
                    return Some(Err(e));
                }
                None => {
                    self.close_page();
                    return None;
                }
            }
        }
    }

    /// Collect every record, suspending once after each request is issued.
    ///
    /// The suspension happens whatever the response status, so a request
    /// answered with 400 or an error status still yields before the stream
    /// ends. Meant to be driven by a [`FetchScheduler`](crate::scheduler::FetchScheduler).
    pub async fn collect_cooperative(mut self) -> Result<Vec<P>, FetchError> {
        let mut records = Vec::new();
        loop {
            let issued_before = self.pages_requested;
            let opened = self.open_page();
            if self.pages_requested > issued_before {
                suspend().await;
            }
            if !opened? {
                break;
            }
            while let Some(record) = self.next_in_page() {
                records.push(record?);
            }
        }
        Ok(records)
    }
}

impl<P: Payload> Iterator for RecordStream<P> {
    type Item = Result<P, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.next_in_page() {
                return Some(item);
            }
            match self.open_page() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<P> fmt::Debug for RecordStream<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStream")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("policy", &self.policy)
            .field("page_open", &self.page.is_some())
            .field("finished", &self.finished)
            .field("pages_requested", &self.pages_requested)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::FieldSpec;
    use crate::scheduler::{FetchScheduler, TaskState};
    use crate::transport::ReplayTransport;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        symbol: String,
        date: NaiveDate,
    }

    impl Payload for Item {
        const ENTITY: &'static str = "item";
        const SCHEMA: &'static [FieldSpec] = &[FieldSpec::key("symbol"), FieldSpec::date("date")];

        fn calendar_date(&self) -> Option<NaiveDate> {
            Some(self.date)
        }
    }

    fn single(transport: &Arc<ReplayTransport>) -> RecordStream<Item> {
        let transport: Arc<dyn HttpTransport> = transport.clone();
        RecordStream::new(transport, "stable/items", WireFormat::JSON, Vec::new(), Paging::Single)
    }

    #[test]
    fn single_page_yields_in_order_and_stops() {
        let transport = Arc::new(ReplayTransport::new().respond(
            200,
            r#"[{"symbol":"A","date":"2024-01-02"},{"symbol":"B","date":"2024-01-01"}]"#,
        ));
        let symbols: Vec<String> = single(&transport).map(|r| r.unwrap().symbol).collect();
        assert_eq!(symbols, vec!["A", "B"]);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.open_bodies(), 0);
    }

    #[test]
    fn unexpected_status_ends_stream() {
        let transport = Arc::new(ReplayTransport::new().respond(500, "boom"));
        let results: Vec<_> = single(&transport).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(FetchError::UnexpectedStatus { status: 500, .. })
        ));
        assert_eq!(transport.open_bodies(), 0);
    }

    #[test]
    fn open_page_issues_without_reading() {
        let transport = Arc::new(ReplayTransport::new().respond(200, "[]"));
        let mut stream = single(&transport);
        assert!(stream.open_page().unwrap());
        assert_eq!(transport.open_bodies(), 1);
        assert!(stream.next_in_page().is_none());
        assert_eq!(transport.open_bodies(), 0);
        assert!(!stream.open_page().unwrap());
        assert!(stream.is_finished());
    }

    #[test]
    fn early_drop_releases_body() {
        let transport = Arc::new(ReplayTransport::new().respond(
            200,
            r#"[{"symbol":"A","date":"2024-01-02"},{"symbol":"B","date":"2024-01-01"}]"#,
        ));
        let mut stream = single(&transport);
        assert!(stream.next().unwrap().is_ok());
        assert_eq!(transport.open_bodies(), 1);
        drop(stream);
        assert_eq!(transport.open_bodies(), 0);
    }

    #[test]
    fn closure_sink_receives_failures() {
        let transport = Arc::new(ReplayTransport::new().respond(
            200,
            r#"[{"symbol":"A","date":"bad"},{"symbol":"B","date":"2024-01-01"}]"#,
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |failure: ValidationFailure| seen.lock().unwrap().push(failure.context)
        };
        let records: Vec<Item> = single(&transport)
            .with_failure_policy(FailurePolicy::collect(sink))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![Some("A".to_string())]);
    }

    #[test]
    fn parts_stop_on_400() {
        let transport = Arc::new(
            ReplayTransport::new()
                .respond(200, "symbol,date\nA,2024-01-01\n")
                .respond(200, "symbol,date\nB,2024-01-01\n")
                .respond(400, ""),
        );
        let dyn_transport: Arc<dyn HttpTransport> = transport.clone();
        let stream: RecordStream<Item> = RecordStream::new(
            dyn_transport,
            "stable/items-bulk",
            WireFormat::Csv,
            Vec::new(),
            Paging::Parts { limit: 100 },
        );
        let records: Vec<Item> = stream.collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        let parts: Vec<_> = transport
            .requests()
            .iter()
            .map(|r| r.param("part").map(str::to_string))
            .collect();
        assert_eq!(parts, vec![Some("0".into()), Some("1".into()), Some("2".into())]);
    }

    #[test]
    fn cooperative_collect_suspends_after_every_request() {
        let transport = Arc::new(
            ReplayTransport::new()
                .respond(200, "symbol,date\nA,2024-01-01\n")
                .respond(200, "symbol,date\nB,2024-01-01\n")
                .respond(400, ""),
        );
        let dyn_transport: Arc<dyn HttpTransport> = transport.clone();
        let stream: RecordStream<Item> = RecordStream::new(
            dyn_transport,
            "stable/items-bulk",
            WireFormat::Csv,
            Vec::new(),
            Paging::Parts { limit: 100 },
        );
        let scheduler = FetchScheduler::new();
        let mut task = scheduler.start(stream.collect_cooperative());
        while scheduler.resume(&mut task) == TaskState::Suspended {}

        // two data parts plus the part answered with 400
        assert_eq!(task.suspensions(), 3);
        assert_eq!(scheduler.await_result(task).unwrap().len(), 2);
    }

    #[test]
    fn cooperative_collect_suspends_before_status_error() {
        let transport = Arc::new(ReplayTransport::new().respond(503, ""));
        let scheduler = FetchScheduler::new();
        let mut task = scheduler.start(single(&transport).collect_cooperative());
        assert_eq!(task.state(), TaskState::Suspended);
        assert_eq!(transport.requests().len(), 1);

        assert_eq!(scheduler.resume(&mut task), TaskState::Completed);
        assert_eq!(task.suspensions(), 1);
        assert!(matches!(
            scheduler.await_result(task),
            Err(FetchError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[test]
    fn parts_limit_is_an_error() {
        let transport = Arc::new(
            ReplayTransport::new()
                .respond(200, "symbol,date\n")
                .respond(200, "symbol,date\n"),
        );
        let dyn_transport: Arc<dyn HttpTransport> = transport.clone();
        let stream: RecordStream<Item> = RecordStream::new(
            dyn_transport,
            "stable/items-bulk",
            WireFormat::Csv,
            Vec::new(),
            Paging::Parts { limit: 2 },
        );
        let results: Vec<_> = stream.collect();
        assert!(matches!(
            results.last(),
            Some(Err(FetchError::PartLimitExceeded { limit: 2, .. }))
        ));
        assert_eq!(transport.requests().len(), 2);
    }
}
