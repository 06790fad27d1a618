//! Submission records as produced by the record cursor.

use serde::{Deserialize, Serialize};

/// A scalar submission value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// An attachment descriptor from `_attachments`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attachment {
    /// Stored path, e.g. `bob/attachments/123_form/1-2_3.jpg`.
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

/// A tagged submission value.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Scalar(Scalar),
    /// Instances of a repeat group, in submitted order.
    Repeat(Vec<SubmissionRecord>),
    /// A list of scalars that is not a repeat group, e.g. `_geolocation`.
    List(Vec<Scalar>),
    Tags(Vec<String>),
    Notes(Vec<String>),
    Attachments(Vec<Attachment>),
}

impl From<Scalar> for RecordValue {
    fn from(value: Scalar) -> Self {
        RecordValue::Scalar(value)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::Scalar(value.into())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        RecordValue::Scalar(value.into())
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        RecordValue::Scalar(value.into())
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        RecordValue::Scalar(value.into())
    }
}

impl From<Vec<SubmissionRecord>> for RecordValue {
    fn from(value: Vec<SubmissionRecord>) -> Self {
        RecordValue::Repeat(value)
    }
}

/// One submission (or one repeat instance): ordered key/value pairs.
///
/// Keys are xpaths or special `_`-prefixed keys; keys may still carry mongo
/// escapes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionRecord {
    entries: Vec<(String, RecordValue)>,
}

impl SubmissionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing entry with the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RecordValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RecordValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.entries
            .iter()
            .find_map(|(_, value)| match value {
                RecordValue::Attachments(list) => Some(list.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

impl<K: Into<String>> FromIterator<(K, RecordValue)> for SubmissionRecord {
    fn from_iter<I: IntoIterator<Item = (K, RecordValue)>>(iter: I) -> Self {
        let mut record = SubmissionRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_replaces_in_place() {
        let mut record = SubmissionRecord::new()
            .with("name", "Abe")
            .with("age", "35");
        record.insert("name", "Bob");
        let keys: Vec<&str> = record.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["name", "age"]);
        assert_eq!(
            record.get("name"),
            Some(&RecordValue::Scalar(Scalar::Text("Bob".to_string())))
        );
    }

    #[test]
    fn attachments_default_to_empty() {
        let record = SubmissionRecord::new().with("name", "Abe");
        assert!(record.attachments().is_empty());
    }
}
