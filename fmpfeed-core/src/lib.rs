//! fmpfeed core: streaming retrieval of typed records from the FMP API.
//!
//! This crate contains:
//! - Incremental JSON-array and CSV decoders over response bodies
//! - Calendar pagination under the per-response record cap
//! - A cooperative, caller-driven scheduler for overlapping requests
//! - Field validation and declarative record mapping
//! - One lazy record stream per endpoint call

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod mapper;
pub mod paginate;
pub mod payload;
pub mod pipeline;
pub mod record;
pub mod scheduler;
pub mod transport;
pub mod validate;

pub use client::FmpClient;
pub use config::ClientConfig;
pub use decode::{JsonLayout, WireFormat};
pub use error::FetchError;
pub use mapper::{FieldKind, FieldSpec, Narrow, Payload};
pub use paginate::{CalendarPaginator, DiagnosticSink, PaginationStall, RECORD_CAP};
pub use pipeline::{FailureLog, FailurePolicy, FailureSink, IgnoreFailures, Paging, RecordStream};
pub use record::RawRecord;
pub use scheduler::{FetchScheduler, FetchTask, TaskState};
pub use transport::{HttpTransport, ResponseHandle};
pub use validate::{RecordValidator, ValidationFailure, ValidationMode};
