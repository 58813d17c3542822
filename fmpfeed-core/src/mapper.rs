//! RecordMapper: declarative schemas and the one routine that applies them.
//!
//! A domain record describes its wire shape once, as an ordered slice of
//! [`FieldSpec`]. [`map_record`] walks the slice with a [`RecordValidator`],
//! builds a normalized object keyed by target names and hands it to serde.
//! The first field is the primary key: once extracted it becomes the context
//! of every later failure in the same record.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::record::RawRecord;
use crate::validate::{
    FailureKind, Fields, Number, RecordValidator, ValidationFailure, ValidationMode,
};

/// Wire type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    NonEmptyString,
    /// Must be present; null or `""` reads as null.
    StringOrNull,
    /// May be absent altogether.
    OptionalString,
    Date,
    Integer,
    IntegerOrNull,
    Number,
    NumberOrNull,
    Float,
    Boolean,
    BooleanOrNull,
}

/// Narrowing applied to a numeric field after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrow {
    Keep,
    ToFloat,
    FloatOrNull,
    IntOrZero,
    IntOrNull,
    FloatOrZero,
}

/// One entry of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub wire: &'static str,
    pub target: &'static str,
    pub kind: FieldKind,
    pub narrow: Narrow,
    pub length: Option<usize>,
    pub max_length: Option<usize>,
    /// A wire token that stands for null, e.g. `"N/A"`.
    pub null_if: Option<&'static str>,
}

impl FieldSpec {
    pub const fn new(wire: &'static str, kind: FieldKind) -> Self {
        Self {
            wire,
            target: wire,
            kind,
            narrow: Narrow::Keep,
            length: None,
            max_length: None,
            null_if: None,
        }
    }

    /// The primary key: a non-empty string.
    pub const fn key(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::NonEmptyString)
    }

    pub const fn string(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::NonEmptyString)
    }

    pub const fn nullable_string(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::StringOrNull)
    }

    pub const fn optional_string(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::OptionalString)
    }

    pub const fn date(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::Date)
    }

    pub const fn integer(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::Integer)
    }

    pub const fn nullable_integer(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::IntegerOrNull)
    }

    pub const fn number(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::Number)
    }

    pub const fn nullable_number(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::NumberOrNull)
    }

    pub const fn float(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::Float)
    }

    pub const fn boolean(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::Boolean)
    }

    pub const fn nullable_boolean(wire: &'static str) -> Self {
        Self::new(wire, FieldKind::BooleanOrNull)
    }

    pub const fn renamed(mut self, target: &'static str) -> Self {
        self.target = target;
        self
    }

    pub const fn narrow(mut self, narrow: Narrow) -> Self {
        self.narrow = narrow;
        self
    }

    pub const fn exact_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub const fn null_if(mut self, token: &'static str) -> Self {
        self.null_if = Some(token);
        self
    }
}

/// A domain record with a declarative wire schema.
pub trait Payload: DeserializeOwned + Sized {
    /// Entity name used in failure messages, e.g. `"available exchange"`.
    const ENTITY: &'static str;
    /// Ordered fields; the first is the primary key.
    const SCHEMA: &'static [FieldSpec];

    /// The date calendar pagination steps by, for calendar endpoints.
    fn calendar_date(&self) -> Option<NaiveDate> {
        None
    }

    fn from_raw(raw: &RawRecord, mode: ValidationMode) -> Result<Self, ValidationFailure> {
        map_record(raw, mode)
    }
}

/// Validate `raw` against `P::SCHEMA` and build the record.
///
/// Stops at the first failing field; a record is either built whole or not at all.
pub fn map_record<P: Payload>(raw: &RawRecord, mode: ValidationMode) -> Result<P, ValidationFailure> {
    let mut validator = RecordValidator::new(P::ENTITY, mode);
    let fields = validator.object(raw)?;
    let normalized = normalize(&mut validator, fields, P::SCHEMA)?;
    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| validator.failure(None, FailureKind::Unmappable(e.to_string()), None))
}

/// Build the target-keyed object for `schema`, threading the primary key as context.
pub fn normalize(
    validator: &mut RecordValidator,
    fields: &Fields,
    schema: &[FieldSpec],
) -> Result<Map<String, Value>, ValidationFailure> {
    let mut out = Map::with_capacity(schema.len());
    for (index, spec) in schema.iter().enumerate() {
        let value = extract(validator, fields, spec)?;
        if index == 0 {
            *validator = validator.with_context(context_text(&value));
        }
        out.insert(spec.target.to_string(), value);
    }
    Ok(out)
}

fn context_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract(
    validator: &RecordValidator,
    fields: &Fields,
    spec: &FieldSpec,
) -> Result<Value, ValidationFailure> {
    let key = spec.wire;
    let value = match spec.kind {
        FieldKind::NonEmptyString => {
            let s = validator.required_str(fields, key)?;
            return checked_string(validator, spec, Some(s));
        }
        FieldKind::StringOrNull => {
            let s = validator.nullable_str(fields, key)?;
            return checked_string(validator, spec, s);
        }
        FieldKind::OptionalString => {
            let s = validator.optional_str(fields, key)?;
            return checked_string(validator, spec, s);
        }
        FieldKind::Date => {
            Value::String(validator.required_date(fields, key)?.format("%Y-%m-%d").to_string())
        }
        FieldKind::Integer => Value::from(validator.required_int(fields, key)?),
        FieldKind::IntegerOrNull => validator
            .optional_int(fields, key)?
            .map_or(Value::Null, Value::from),
        FieldKind::Number => narrow(Some(validator.required_number(fields, key)?), spec.narrow),
        FieldKind::NumberOrNull => narrow(validator.optional_number(fields, key)?, spec.narrow),
        FieldKind::Float => float_value(validator.required_float(fields, key)?),
        FieldKind::Boolean => Value::Bool(validator.required_bool(fields, key)?),
        FieldKind::BooleanOrNull => validator
            .optional_bool(fields, key)?
            .map_or(Value::Null, Value::Bool),
    };
    Ok(value)
}

fn checked_string(
    validator: &RecordValidator,
    spec: &FieldSpec,
    value: Option<String>,
) -> Result<Value, ValidationFailure> {
    let value = value.filter(|s| Some(s.as_str()) != spec.null_if);
    let Some(s) = value else {
        return Ok(Value::Null);
    };
    if let Some(length) = spec.length {
        validator.assert_length(&s, length, Some(spec.wire))?;
    }
    if let Some(max) = spec.max_length {
        validator.assert_max_length(&s, max, Some(spec.wire))?;
    }
    Ok(Value::String(s))
}

fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn narrow(number: Option<Number>, narrow: Narrow) -> Value {
    match (narrow, number) {
        (Narrow::Keep, Some(n)) => n.to_value(),
        (Narrow::ToFloat | Narrow::FloatOrNull | Narrow::FloatOrZero, Some(n)) => {
            float_value(n.as_f64())
        }
        (Narrow::IntOrZero | Narrow::IntOrNull, Some(n)) => Value::from(n.truncate()),
        (Narrow::IntOrZero, None) => Value::from(0),
        (Narrow::FloatOrZero, None) => float_value(0.0),
        (_, None) => Value::Null,
    }
}
