//! RecordValidator: typed field extraction from raw records.
//!
//! Every accessor either returns a typed value or a [`ValidationFailure`]
//! naming the entity, the record context (usually the primary key), the field
//! and the offending value. The context is threaded explicitly with
//! [`RecordValidator::with_context`]; the validator itself is immutable.
//!
//! Two modes exist:
//! - [`ValidationMode::Strict`] (JSON): the wire type must already match.
//! - [`ValidationMode::Lenient`] (CSV): textual numerics and booleans are
//!   coerced, and an empty cell counts as null for nullable fields.

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::record::RawRecord;

pub type Fields = Map<String, Value>;

/// Wire-format dependent coercion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationMode {
    Strict,
    Lenient,
}

/// A numeric wire value that has not been narrowed yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Truncates toward zero; saturates at the i64 bounds.
    pub fn truncate(self) -> i64 {
        match self {
            Number::Int(i) => i,
            Number::Float(f) => f as i64,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            Number::Int(i) => Value::from(i),
            Number::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// Parse numeric text. A decimal point makes it a float, anything else an integer.
///
/// Exponent forms without a decimal point (`"1e5"`) are accepted and become
/// integers. Non-finite spellings (`"inf"`, `"NaN"`) are rejected.
pub fn parse_numeric(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.contains('.') {
        return text
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Number::Float);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::Int(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| Number::Int(f as i64))
}

/// Numeric coercion shared by both modes: native numbers and numeric strings.
pub fn coerce_numeric(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Number::Int)
            .or_else(|| n.as_f64().map(Number::Float)),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
        .then_some(f as i64)
}

/// Lenient integer check: integers, integral floats, and their textual forms.
fn coerce_integerish(value: &Value) -> Option<i64> {
    match coerce_numeric(value)? {
        Number::Int(i) => Some(i),
        Number::Float(f) => integral(f),
    }
}

/// CSV boolean tokens. Unrecognized tokens are rejected rather than read as false.
pub fn parse_bool_token(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// What went wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    NotAnObject,
    MissingField,
    NotNonEmptyString,
    NotStringOrNull,
    NotDate,
    NotInteger,
    NotIntegerOrNull,
    /// Lenient counterpart of `NotInteger`: not even integral text.
    NotIntegerish,
    NotIntegerishOrNull,
    NotNumeric,
    NotNumericOrNull,
    NotBoolean,
    NotBooleanOrNull,
    WrongLength { expected: usize },
    TooLong { max: usize },
    /// The validated fields could not be assembled into the record type.
    Unmappable(String),
}

/// One field of one record failed a check.
///
/// Carried as a value: the pipeline decides whether it aborts the stream or is
/// routed to a sink.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.message())]
pub struct ValidationFailure {
    pub entity: String,
    pub context: Option<String>,
    pub field: Option<String>,
    pub kind: FailureKind,
    /// Textual form of the offending value, when there was one.
    pub value: Option<String>,
}

impl ValidationFailure {
    /// "field of entity in context", the subject of every message.
    fn path(&self, with_field: bool) -> String {
        let mut path = self.entity.clone();
        if let Some(context) = &self.context {
            path = format!("{path} in {context}");
        }
        match (&self.field, with_field) {
            (Some(field), true) => format!("{field} of {path}"),
            _ => path,
        }
    }

    fn expectation(&self) -> Cow<'static, str> {
        match &self.kind {
            FailureKind::NotAnObject => "must be an object".into(),
            FailureKind::MissingField => "must contain the field".into(),
            FailureKind::NotNonEmptyString => "must be a non-empty-string".into(),
            FailureKind::NotStringOrNull => "must be a string or null".into(),
            FailureKind::NotDate => "must be a date in YYYY-MM-DD form".into(),
            FailureKind::NotInteger => "must be an integer".into(),
            FailureKind::NotIntegerOrNull => "must be an integer or null".into(),
            FailureKind::NotIntegerish => "must be an integerish".into(),
            FailureKind::NotIntegerishOrNull => "must be an integerish or null".into(),
            FailureKind::NotNumeric => "must be numeric".into(),
            FailureKind::NotNumericOrNull => "must be numeric or null".into(),
            FailureKind::NotBoolean => "must be a boolean".into(),
            FailureKind::NotBooleanOrNull => "must be a boolean or null".into(),
            FailureKind::WrongLength { expected } => {
                format!("must have exactly {expected} characters").into()
            }
            FailureKind::TooLong { max } => format!("must not exceed {max} characters").into(),
            FailureKind::Unmappable(reason) => format!("could not be mapped: {reason}").into(),
        }
    }

    /// Human-readable message naming the field, entity, context and value.
    pub fn message(&self) -> String {
        let mut message = match &self.kind {
            FailureKind::MissingField => {
                return format!(
                    "The {} must contain a \"{}\" key.",
                    self.path(false),
                    self.field.as_deref().unwrap_or_default()
                )
            }
            _ => format!("The {} {}.", self.path(true), self.expectation()),
        };
        let quotes_value = !matches!(
            self.kind,
            FailureKind::WrongLength { .. } | FailureKind::TooLong { .. }
        );
        if let (true, Some(value)) = (quotes_value, &self.value) {
            message.push_str(" Got: ");
            message.push_str(value);
        }
        message
    }
}

/// Render a wire value the way failure messages quote it.
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

/// Immutable field extractor for one entity.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    entity: Cow<'static, str>,
    context: Option<String>,
    mode: ValidationMode,
}

impl RecordValidator {
    pub fn new(entity: impl Into<Cow<'static, str>>, mode: ValidationMode) -> Self {
        Self {
            entity: entity.into(),
            context: None,
            mode,
        }
    }

    /// A copy of this validator whose failures name `context`.
    pub fn with_context(&self, context: impl Into<String>) -> Self {
        Self {
            entity: self.entity.clone(),
            context: Some(context.into()),
            mode: self.mode,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    fn is_lenient(&self) -> bool {
        self.mode == ValidationMode::Lenient
    }

    pub fn failure(
        &self,
        field: Option<&str>,
        kind: FailureKind,
        value: Option<&Value>,
    ) -> ValidationFailure {
        ValidationFailure {
            entity: self.entity.to_string(),
            context: self.context.clone(),
            field: field.map(str::to_string),
            kind,
            value: value.map(describe_value),
        }
    }

    /// The record's field map, or a failure if the item is not an object.
    pub fn object<'r>(&self, record: &'r RawRecord) -> Result<&'r Fields, ValidationFailure> {
        record
            .fields()
            .ok_or_else(|| self.failure(None, FailureKind::NotAnObject, Some(record.as_value())))
    }

    /// The raw value of a field that must be present (it may be null).
    pub fn value<'r>(&self, fields: &'r Fields, key: &str) -> Result<&'r Value, ValidationFailure> {
        fields
            .get(key)
            .ok_or_else(|| self.failure(Some(key), FailureKind::MissingField, None))
    }

    fn is_null(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => self.is_lenient() && s.is_empty(),
            _ => false,
        }
    }

    pub fn required_str(&self, fields: &Fields, key: &str) -> Result<String, ValidationFailure> {
        match self.value(fields, key)? {
            Value::String(s) if !s.is_empty() => Ok(s.clone()),
            other => Err(self.failure(Some(key), FailureKind::NotNonEmptyString, Some(other))),
        }
    }

    /// A field that must be present but may be null; `""` reads as null.
    pub fn nullable_str(
        &self,
        fields: &Fields,
        key: &str,
    ) -> Result<Option<String>, ValidationFailure> {
        let value = self.value(fields, key)?;
        self.string_or_null(key, value)
    }

    /// A field that may be absent altogether.
    pub fn optional_str(
        &self,
        fields: &Fields,
        key: &str,
    ) -> Result<Option<String>, ValidationFailure> {
        match fields.get(key) {
            None => Ok(None),
            Some(value) => self.string_or_null(key, value),
        }
    }

    fn string_or_null(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<Option<String>, ValidationFailure> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            other => Err(self.failure(Some(key), FailureKind::NotStringOrNull, Some(other))),
        }
    }

    pub fn required_date(&self, fields: &Fields, key: &str) -> Result<NaiveDate, ValidationFailure> {
        let value = self.value(fields, key)?;
        value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| self.failure(Some(key), FailureKind::NotDate, Some(value)))
    }

    pub fn required_int(&self, fields: &Fields, key: &str) -> Result<i64, ValidationFailure> {
        let value = self.value(fields, key)?;
        let kind = match self.mode {
            ValidationMode::Strict => FailureKind::NotInteger,
            ValidationMode::Lenient => FailureKind::NotIntegerish,
        };
        self.integer(value)
            .ok_or_else(|| self.failure(Some(key), kind, Some(value)))
    }

    pub fn optional_int(&self, fields: &Fields, key: &str) -> Result<Option<i64>, ValidationFailure> {
        let value = self.value(fields, key)?;
        if self.is_null(value) {
            return Ok(None);
        }
        let kind = match self.mode {
            ValidationMode::Strict => FailureKind::NotIntegerOrNull,
            ValidationMode::Lenient => FailureKind::NotIntegerishOrNull,
        };
        self.integer(value)
            .map(Some)
            .ok_or_else(|| self.failure(Some(key), kind, Some(value)))
    }

    fn integer(&self, value: &Value) -> Option<i64> {
        match self.mode {
            ValidationMode::Strict => value.as_i64(),
            ValidationMode::Lenient => coerce_integerish(value),
        }
    }

    pub fn required_number(&self, fields: &Fields, key: &str) -> Result<Number, ValidationFailure> {
        let value = self.value(fields, key)?;
        coerce_numeric(value)
            .ok_or_else(|| self.failure(Some(key), FailureKind::NotNumeric, Some(value)))
    }

    pub fn optional_number(
        &self,
        fields: &Fields,
        key: &str,
    ) -> Result<Option<Number>, ValidationFailure> {
        let value = self.value(fields, key)?;
        if self.is_null(value) {
            return Ok(None);
        }
        coerce_numeric(value)
            .map(Some)
            .ok_or_else(|| self.failure(Some(key), FailureKind::NotNumericOrNull, Some(value)))
    }

    pub fn required_float(&self, fields: &Fields, key: &str) -> Result<f64, ValidationFailure> {
        self.required_number(fields, key).map(Number::as_f64)
    }

    pub fn required_bool(&self, fields: &Fields, key: &str) -> Result<bool, ValidationFailure> {
        let value = self.value(fields, key)?;
        self.boolean(value)
            .ok_or_else(|| self.failure(Some(key), FailureKind::NotBoolean, Some(value)))
    }

    pub fn optional_bool(
        &self,
        fields: &Fields,
        key: &str,
    ) -> Result<Option<bool>, ValidationFailure> {
        let value = self.value(fields, key)?;
        if self.is_null(value) {
            return Ok(None);
        }
        self.boolean(value)
            .map(Some)
            .ok_or_else(|| self.failure(Some(key), FailureKind::NotBooleanOrNull, Some(value)))
    }

    fn boolean(&self, value: &Value) -> Option<bool> {
        match (value, self.mode) {
            (Value::Bool(b), _) => Some(*b),
            (Value::String(s), ValidationMode::Lenient) => parse_bool_token(s),
            _ => None,
        }
    }

    pub fn assert_length(
        &self,
        value: &str,
        expected: usize,
        key: Option<&str>,
    ) -> Result<(), ValidationFailure> {
        if value.chars().count() == expected {
            Ok(())
        } else {
            Err(self.failure(
                key,
                FailureKind::WrongLength { expected },
                Some(&Value::String(value.to_string())),
            ))
        }
    }

    pub fn assert_max_length(
        &self,
        value: &str,
        max: usize,
        key: Option<&str>,
    ) -> Result<(), ValidationFailure> {
        if value.chars().count() <= max {
            Ok(())
        } else {
            Err(self.failure(
                key,
                FailureKind::TooLong { max },
                Some(&Value::String(value.to_string())),
            ))
        }
    }
}
