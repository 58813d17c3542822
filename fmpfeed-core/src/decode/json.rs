//! Incremental JSON array decoder.
//!
//! The body is scanned byte by byte through a `BufReader`. Only the bytes of
//! the current element are copied out, into one reusable buffer, and parsed
//! with `serde_json`. Memory stays bounded by the largest single element no
//! matter how many elements the array holds.

use std::io::{BufRead, BufReader, Read};

use serde_json::Value;

use crate::error::FetchError;
use crate::record::RawRecord;

use super::JsonLayout;

/// Tracks nesting while copying one composite or string value.
#[derive(Default)]
struct ValueScan {
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ValueScan {
    /// Feed one byte; true once the value is complete.
    fn feed(&mut self, b: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == b'"' {
                self.in_string = false;
                return self.depth == 0;
            }
            return false;
        }
        match b {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth = self.depth.saturating_sub(1);
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }
}

fn is_scalar_end(b: u8) -> bool {
    matches!(b, b',' | b']' | b'}') || b.is_ascii_whitespace()
}

struct Scanner<R> {
    reader: BufReader<R>,
    endpoint: String,
}

impl<R: Read> Scanner<R> {
    fn unexpected_end(&self) -> FetchError {
        FetchError::malformed(&self.endpoint, "unexpected end of body")
    }

    /// Skip whitespace and peek the next byte without consuming it.
    fn skip_ws(&mut self) -> Result<Option<u8>, FetchError> {
        loop {
            let chunk = self
                .reader
                .fill_buf()
                .map_err(|e| FetchError::transport(&self.endpoint, e.to_string()))?;
            if chunk.is_empty() {
                return Ok(None);
            }
            match chunk.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(i) => {
                    let b = chunk[i];
                    self.reader.consume(i);
                    return Ok(Some(b));
                }
                None => {
                    let n = chunk.len();
                    self.reader.consume(n);
                }
            }
        }
    }

    fn expect(&mut self, wanted: u8) -> Result<(), FetchError> {
        match self.skip_ws()? {
            Some(b) if b == wanted => {
                self.reader.consume(1);
                Ok(())
            }
            Some(b) => Err(FetchError::malformed(
                &self.endpoint,
                format!("expected '{}', found '{}'", wanted as char, b as char),
            )),
            None => Err(self.unexpected_end()),
        }
    }

    /// Copy the bytes of exactly one JSON value into `out`.
    fn read_value(&mut self, out: &mut Vec<u8>) -> Result<(), FetchError> {
        match self.skip_ws()? {
            None => Err(self.unexpected_end()),
            Some(b'{' | b'[' | b'"') => self.read_composite(out),
            Some(_) => self.read_scalar(out),
        }
    }

    fn read_composite(&mut self, out: &mut Vec<u8>) -> Result<(), FetchError> {
        let mut scan = ValueScan::default();
        loop {
            let chunk = self
                .reader
                .fill_buf()
                .map_err(|e| FetchError::transport(&self.endpoint, e.to_string()))?;
            if chunk.is_empty() {
                return Err(FetchError::malformed(&self.endpoint, "unexpected end of body"));
            }
            match chunk.iter().position(|&b| scan.feed(b)) {
                Some(i) => {
                    out.extend_from_slice(&chunk[..=i]);
                    self.reader.consume(i + 1);
                    return Ok(());
                }
                None => {
                    let n = chunk.len();
                    out.extend_from_slice(chunk);
                    self.reader.consume(n);
                }
            }
        }
    }

    fn read_scalar(&mut self, out: &mut Vec<u8>) -> Result<(), FetchError> {
        loop {
            let chunk = self
                .reader
                .fill_buf()
                .map_err(|e| FetchError::transport(&self.endpoint, e.to_string()))?;
            if chunk.is_empty() {
                return Ok(());
            }
            match chunk.iter().position(|&b| is_scalar_end(b)) {
                Some(i) => {
                    out.extend_from_slice(&chunk[..i]);
                    self.reader.consume(i);
                    return Ok(());
                }
                None => {
                    let n = chunk.len();
                    out.extend_from_slice(chunk);
                    self.reader.consume(n);
                }
            }
        }
    }

    /// Walk the members of a top-level object until `key`, positioned inside its array.
    ///
    /// Returns false when the object has no such member. Skipped values are
    /// copied into `scratch` one at a time and checked for syntax only.
    fn seek_member(&mut self, key: &str, scratch: &mut Vec<u8>) -> Result<bool, FetchError> {
        self.expect(b'{')?;
        loop {
            match self.skip_ws()? {
                Some(b'}') => {
                    self.reader.consume(1);
                    return Ok(false);
                }
                Some(b'"') => {}
                Some(b) => {
                    return Err(FetchError::malformed(
                        &self.endpoint,
                        format!("expected object key, found '{}'", b as char),
                    ))
                }
                None => return Err(self.unexpected_end()),
            }
            scratch.clear();
            self.read_value(scratch)?;
            let name: String = serde_json::from_slice(scratch)
                .map_err(|e| FetchError::malformed(&self.endpoint, e.to_string()))?;
            self.expect(b':')?;
            if name == key {
                self.expect(b'[')?;
                return Ok(true);
            }
            scratch.clear();
            self.read_value(scratch)?;
            serde_json::from_slice::<serde::de::IgnoredAny>(scratch)
                .map_err(|e| FetchError::malformed(&self.endpoint, e.to_string()))?;
            match self.skip_ws()? {
                Some(b',') => self.reader.consume(1),
                Some(b'}') => {
                    self.reader.consume(1);
                    return Ok(false);
                }
                Some(b) => {
                    return Err(FetchError::malformed(
                        &self.endpoint,
                        format!("expected ',' or '}}', found '{}'", b as char),
                    ))
                }
                None => return Err(self.unexpected_end()),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    FirstElement,
    NextElement,
}

/// Lazily yields the elements of a JSON array body as [`RawRecord`]s.
///
/// The reader is dropped as soon as the array ends or an error is raised;
/// dropping the decoder early drops it too.
pub struct JsonArrayDecoder<R> {
    scanner: Option<Scanner<R>>,
    layout: JsonLayout,
    state: State,
    element: Vec<u8>,
}

impl<R: Read> JsonArrayDecoder<R> {
    pub fn new(reader: R, layout: JsonLayout, endpoint: impl Into<String>) -> Self {
        Self {
            scanner: Some(Scanner {
                reader: BufReader::new(reader),
                endpoint: endpoint.into(),
            }),
            layout,
            state: State::Start,
            element: Vec::new(),
        }
    }

    /// True once the body has been fully consumed or abandoned after an error.
    pub fn is_released(&self) -> bool {
        self.scanner.is_none()
    }

    fn step(&mut self) -> Result<Option<RawRecord>, FetchError> {
        let Some(scanner) = self.scanner.as_mut() else {
            return Ok(None);
        };
        loop {
            match self.state {
                State::Start => {
                    if scanner.skip_ws()?.is_none() {
                        return Ok(None);
                    }
                    match self.layout {
                        JsonLayout::Array => scanner.expect(b'[')?,
                        JsonLayout::Wrapped(key) => {
                            if !scanner.seek_member(key, &mut self.element)? {
                                return Ok(None);
                            }
                        }
                    }
                    self.state = State::FirstElement;
                }
                State::FirstElement => {
                    if scanner.skip_ws()? == Some(b']') {
                        scanner.reader.consume(1);
                        return finish(scanner, self.layout);
                    }
                    self.state = State::NextElement;
                    return element(scanner, &mut self.element).map(Some);
                }
                State::NextElement => match scanner.skip_ws()? {
                    Some(b',') => {
                        scanner.reader.consume(1);
                        return element(scanner, &mut self.element).map(Some);
                    }
                    Some(b']') => {
                        scanner.reader.consume(1);
                        return finish(scanner, self.layout);
                    }
                    Some(b) => {
                        return Err(FetchError::malformed(
                            &scanner.endpoint,
                            format!("expected ',' or ']', found '{}'", b as char),
                        ))
                    }
                    None => return Err(scanner.unexpected_end()),
                },
            }
        }
    }
}

fn element<R: Read>(scanner: &mut Scanner<R>, buf: &mut Vec<u8>) -> Result<RawRecord, FetchError> {
    buf.clear();
    scanner.read_value(buf)?;
    serde_json::from_slice::<Value>(buf)
        .map(RawRecord::new)
        .map_err(|e| FetchError::malformed(&scanner.endpoint, e.to_string()))
}

/// After the array closes: a bare array must be the whole body.
fn finish<R: Read>(scanner: &mut Scanner<R>, layout: JsonLayout) -> Result<Option<RawRecord>, FetchError> {
    if layout == JsonLayout::Array {
        if let Some(b) = scanner.skip_ws()? {
            return Err(FetchError::malformed(
                &scanner.endpoint,
                format!("trailing data after array: '{}'", b as char),
            ));
        }
    }
    Ok(None)
}

impl<R: Read> Iterator for JsonArrayDecoder<R> {
    type Item = Result<RawRecord, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.scanner = None;
                None
            }
            Err(e) => {
                self.scanner = None;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Serves one byte per read call and flags when dropped.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(1);
            self.data.read(&mut buf[..n])
        }
    }

    impl Drop for Trickle {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn trickle(body: &str) -> (Trickle, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = Trickle {
            data: Cursor::new(body.as_bytes().to_vec()),
            dropped: Arc::clone(&dropped),
        };
        (reader, dropped)
    }

    fn decode(body: &str, layout: JsonLayout) -> Vec<Result<RawRecord, FetchError>> {
        JsonArrayDecoder::new(Cursor::new(body.as_bytes().to_vec()), layout, "test").collect()
    }

    fn values(body: &str) -> Vec<Value> {
        decode(body, JsonLayout::Array)
            .into_iter()
            .map(|r| r.unwrap().into_value())
            .collect()
    }

    #[test]
    fn yields_elements_in_order() {
        assert_eq!(values(r#"[{"a":1},{"a":2}]"#), vec![json!({"a":1}), json!({"a":2})]);
    }

    #[test]
    fn empty_body_and_empty_array() {
        assert!(values("").is_empty());
        assert!(values("  \n").is_empty());
        assert!(values("[ ]").is_empty());
    }

    #[test]
    fn strings_may_contain_brackets_and_escapes() {
        let got = values(r#"[ {"s":"a]\"}{[","n":[1,{"x":null}]} , {"s":"\\"} ]"#);
        assert_eq!(got[0]["s"], json!("a]\"}{["));
        assert_eq!(got[0]["n"], json!([1, {"x": null}]));
        assert_eq!(got[1]["s"], json!("\\"));
    }

    #[test]
    fn scalar_elements_are_kept() {
        assert_eq!(values("[1, -2.5e3,true,null,\"x\"]").len(), 5);
    }

    #[test]
    fn one_byte_chunks_decode_identically() {
        let body = r#"[{"symbol":"AAPL","price":189.5},{"symbol":"MSFT","price":410}]"#;
        let (reader, _) = trickle(body);
        let got: Vec<Value> = JsonArrayDecoder::new(reader, JsonLayout::Array, "test")
            .map(|r| r.unwrap().into_value())
            .collect();
        assert_eq!(got, values(body));
    }

    #[test]
    fn releases_reader_when_exhausted() {
        let (reader, dropped) = trickle(r#"[{"a":1}]"#);
        let mut decoder = JsonArrayDecoder::new(reader, JsonLayout::Array, "test");
        assert!(decoder.next().unwrap().is_ok());
        assert!(!dropped.load(Ordering::SeqCst));
        assert!(decoder.next().is_none());
        assert!(dropped.load(Ordering::SeqCst));
        assert!(decoder.is_released());
    }

    #[test]
    fn releases_reader_when_abandoned() {
        let (reader, dropped) = trickle(r#"[{"a":1},{"a":2}]"#);
        let mut decoder = JsonArrayDecoder::new(reader, JsonLayout::Array, "test");
        assert!(decoder.next().unwrap().is_ok());
        drop(decoder);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn truncated_body_is_malformed_after_good_elements() {
        let got = decode(r#"[{"a":1},{"a":"#, JsonLayout::Array);
        assert_eq!(got.len(), 2);
        assert!(got[0].is_ok());
        assert!(matches!(got[1], Err(FetchError::MalformedResponse { .. })));
    }

    #[test]
    fn syntax_errors_are_malformed() {
        for body in ["{\"a\":1}", "[1,]", "[{\"a\":1} {\"a\":2}]", "[{\"a\" 1}]", "[1] x"] {
            let got = decode(body, JsonLayout::Array);
            assert!(
                got.iter()
                    .any(|r| matches!(r, Err(FetchError::MalformedResponse { .. }))),
                "{body}"
            );
        }
    }

    #[test]
    fn wrapped_layout_skips_other_members() {
        let body = r#"{"symbol":"AAPL","meta":{"k":[1,2]},"historical":[{"close":1},{"close":2}],"tail":3}"#;
        let got: Vec<Value> = decode(body, JsonLayout::Wrapped("historical"))
            .into_iter()
            .map(|r| r.unwrap().into_value())
            .collect();
        assert_eq!(got, vec![json!({"close":1}), json!({"close":2})]);
    }

    #[test]
    fn wrapped_layout_without_member_is_empty() {
        assert!(decode(r#"{"symbol":"AAPL"}"#, JsonLayout::Wrapped("historical")).is_empty());
        assert!(decode("{}", JsonLayout::Wrapped("historical")).is_empty());
    }
}
