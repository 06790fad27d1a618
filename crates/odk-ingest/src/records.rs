//! Submission record cursor over JSON files.
//!
//! Two layouts are accepted: a single JSON array of submission objects, or
//! newline-delimited JSON with one submission per line.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use odk_model::tags::{ATTACHMENTS, NOTES, TAGS};
use odk_model::{Attachment, RecordValue, Scalar, SubmissionRecord};

use crate::error::{IngestError, Result};

fn scalar_from_json(value: Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Bool(flag) => Scalar::Bool(flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Scalar::Int(int),
            None => number.as_f64().map_or(Scalar::Null, Scalar::Float),
        },
        Value::String(text) => Scalar::Text(text),
        other => Scalar::Text(other.to_string()),
    }
}

fn text_from_json(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn notes_from_json(items: Vec<Value>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(mut object) => object
                .remove("note")
                .map(text_from_json)
                .unwrap_or_default(),
            other => text_from_json(other),
        })
        .collect()
}

fn attachments_from_json(items: Vec<Value>, ordinal: usize) -> Result<Vec<Attachment>> {
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|err| IngestError::Record {
                ordinal,
                message: format!("invalid attachment: {err}"),
            })
        })
        .collect()
}

fn value_from_json(key: &str, value: Value, ordinal: usize) -> Result<RecordValue> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(object) => return Ok(RecordValue::Scalar(Scalar::Text(Value::Object(object).to_string()))),
        scalar => return Ok(RecordValue::Scalar(scalar_from_json(scalar))),
    };
    match key {
        TAGS => Ok(RecordValue::Tags(items.into_iter().map(text_from_json).collect())),
        NOTES => Ok(RecordValue::Notes(notes_from_json(items))),
        ATTACHMENTS => Ok(RecordValue::Attachments(attachments_from_json(items, ordinal)?)),
        _ if items.iter().all(Value::is_object) => {
            let children = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(object) => Some(record_from_object(object, ordinal)),
                    _ => None,
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RecordValue::Repeat(children))
        }
        _ => Ok(RecordValue::List(items.into_iter().map(scalar_from_json).collect())),
    }
}

fn record_from_object(object: Map<String, Value>, ordinal: usize) -> Result<SubmissionRecord> {
    let mut record = SubmissionRecord::new();
    for (key, value) in object {
        let value = value_from_json(&key, value, ordinal)?;
        record.insert(key, value);
    }
    Ok(record)
}

/// Convert one submission JSON object into a [`SubmissionRecord`].
///
/// Lists of objects become repeat groups; `_tags`, `_notes` and
/// `_attachments` keep their dedicated variants; other lists become scalar
/// lists.
pub fn record_from_json(value: Value, ordinal: usize) -> Result<SubmissionRecord> {
    match value {
        Value::Object(object) => record_from_object(object, ordinal),
        other => Err(IngestError::Record {
            ordinal,
            message: format!("expected a JSON object, found {other}"),
        }),
    }
}

enum Source {
    Array(std::vec::IntoIter<Value>),
    Lines(std::io::Lines<BufReader<File>>),
}

/// Iterator over the submissions of a data file.
pub struct RecordCursor {
    source: Source,
    ordinal: usize,
    total: Option<usize>,
}

impl RecordCursor {
    /// Open a JSON array or NDJSON file.
    pub fn open(path: &Path) -> Result<Self> {
        let read_err = |source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_err)?;
        let mut reader = BufReader::new(file);
        let is_array = loop {
            let buffer = reader.fill_buf().map_err(read_err)?;
            if buffer.is_empty() {
                break false;
            }
            match buffer.iter().position(|byte| !byte.is_ascii_whitespace()) {
                Some(pos) => {
                    let first = buffer[pos];
                    reader.consume(pos);
                    break first == b'[';
                }
                None => {
                    let len = buffer.len();
                    reader.consume(len);
                }
            }
        };

        if is_array {
            let mut text = String::new();
            reader.read_to_string(&mut text).map_err(read_err)?;
            let values: Vec<Value> =
                serde_json::from_str(&text).map_err(|source| IngestError::Json {
                    context: path.display().to_string(),
                    source,
                })?;
            debug!(path = %path.display(), submissions = values.len(), "opened json array");
            Ok(Self::from_values(values))
        } else {
            debug!(path = %path.display(), "opened ndjson stream");
            Ok(Self {
                source: Source::Lines(reader.lines()),
                ordinal: 0,
                total: None,
            })
        }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            total: Some(values.len()),
            source: Source::Array(values.into_iter()),
            ordinal: 0,
        }
    }

    /// Number of submissions, when known up front.
    pub fn total(&self) -> Option<usize> {
        self.total
    }
}

impl Iterator for RecordCursor {
    type Item = Result<SubmissionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = match &mut self.source {
            Source::Array(values) => values.next()?,
            Source::Lines(lines) => loop {
                let line = match lines.next()? {
                    Ok(line) => line,
                    Err(err) => {
                        self.ordinal += 1;
                        return Some(Err(IngestError::Record {
                            ordinal: self.ordinal,
                            message: err.to_string(),
                        }));
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str(&line) {
                    Ok(value) => break value,
                    Err(source) => {
                        self.ordinal += 1;
                        return Some(Err(IngestError::Json {
                            context: format!("submission {}", self.ordinal),
                            source,
                        }));
                    }
                }
            },
        };
        self.ordinal += 1;
        Some(record_from_json(value, self.ordinal))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            Source::Array(values) => values.size_hint(),
            Source::Lines(_) => (0, None),
        }
    }
}
