//! RawRecord: one decoded wire item before validation.

use serde_json::{Map, Value};

/// A single decoded item, still dynamically typed.
///
/// CSV rows always decode to an object of strings. JSON elements keep their
/// wire types; an element that is not an object is kept as-is and rejected
/// later by the validator, so one odd element never aborts a whole page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    value: Value,
}

impl RawRecord {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Build a record from CSV header/cell pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fields: Map<String, Value> = pairs
            .into_iter()
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();
        Self {
            value: Value::Object(fields),
        }
    }

    /// The field map, if this item is an object.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.value.as_object()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields().and_then(|fields| fields.get(field))
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_pairs_keep_header_order() {
        let record = RawRecord::from_pairs([("c", "3"), ("a", "1"), ("b", "2")]);
        let names: Vec<&str> = record
            .fields()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(record.get("a"), Some(&json!("1")));
    }

    #[test]
    fn non_object_has_no_fields() {
        let record = RawRecord::new(json!(42));
        assert!(record.fields().is_none());
        assert!(record.get("symbol").is_none());
    }
}
