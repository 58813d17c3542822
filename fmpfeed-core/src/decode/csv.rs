//! Incremental CSV decoder: header line, then one record per row.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};

use crate::error::FetchError;
use crate::record::RawRecord;

/// Lazily yields CSV rows zipped against the header.
///
/// Rows are read into one reusable [`StringRecord`]. A row whose column count
/// differs from the header is a protocol failure.
pub struct CsvRowDecoder<R> {
    reader: Option<csv::Reader<R>>,
    headers: Option<StringRecord>,
    row: StringRecord,
    endpoint: String,
}

impl<R: Read> CsvRowDecoder<R> {
    pub fn new(reader: R, endpoint: impl Into<String>) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);
        Self {
            reader: Some(reader),
            headers: None,
            row: StringRecord::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }

    fn classify(&self, e: csv::Error) -> FetchError {
        if e.is_io_error() {
            FetchError::transport(&self.endpoint, e.to_string())
        } else {
            FetchError::malformed(&self.endpoint, e.to_string())
        }
    }

    fn step(&mut self) -> Result<Option<RawRecord>, FetchError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        if self.headers.is_none() {
            match reader.headers().map(StringRecord::clone) {
                Ok(headers) => self.headers = Some(headers),
                Err(e) => return Err(self.classify(e)),
            }
        }
        match reader.read_record(&mut self.row) {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(e) => return Err(self.classify(e)),
        }
        let Some(headers) = self.headers.as_ref() else {
            return Ok(None);
        };
        Ok(Some(RawRecord::from_pairs(headers.iter().zip(self.row.iter()))))
    }
}

impl<R: Read> Iterator for CsvRowDecoder<R> {
    type Item = Result<RawRecord, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.reader = None;
                None
            }
            Err(e) => {
                self.reader = None;
                Some(Err(e))
            }
        }
    }
}
