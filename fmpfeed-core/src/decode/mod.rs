//! StreamDecoder: response bodies as lazy record sequences.
//!
//! Both decoders are forward-only and non-restartable. They drop the body
//! reader (and with it the connection) as soon as the body is exhausted or a
//! protocol error is raised; dropping the decoder early does the same.

pub mod csv;
pub mod json;

use std::io::Read;

use crate::error::FetchError;
use crate::record::RawRecord;
use crate::validate::ValidationMode;

pub use self::csv::CsvRowDecoder;
pub use self::json::JsonArrayDecoder;

/// A response body as handed out by a transport.
pub type Body = Box<dyn Read + Send>;

/// Where the record array sits in a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    /// The body is the array.
    Array,
    /// The body is an object; the array is the member with this key.
    Wrapped(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json(JsonLayout),
    Csv,
}

impl WireFormat {
    pub const JSON: WireFormat = WireFormat::Json(JsonLayout::Array);

    /// CSV carries no types, so it is validated leniently.
    pub fn validation_mode(self) -> ValidationMode {
        match self {
            WireFormat::Json(_) => ValidationMode::Strict,
            WireFormat::Csv => ValidationMode::Lenient,
        }
    }
}

/// A decoder for either wire format.
pub enum RecordDecoder {
    Json(JsonArrayDecoder<Body>),
    Csv(CsvRowDecoder<Body>),
}

impl RecordDecoder {
    pub fn is_released(&self) -> bool {
        match self {
            RecordDecoder::Json(d) => d.is_released(),
            RecordDecoder::Csv(d) => d.is_released(),
        }
    }
}

impl Iterator for RecordDecoder {
    type Item = Result<RawRecord, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RecordDecoder::Json(d) => d.next(),
            RecordDecoder::Csv(d) => d.next(),
        }
    }
}

/// Start decoding `body` as `format`. Nothing is read until the first `next`.
pub fn decode(body: Body, format: WireFormat, endpoint: &str) -> RecordDecoder {
    match format {
        WireFormat::Json(layout) => RecordDecoder::Json(JsonArrayDecoder::new(body, layout, endpoint)),
        WireFormat::Csv => RecordDecoder::Csv(CsvRowDecoder::new(body, endpoint)),
    }
}
