//! Repeat flattening.
//!
//! A submission becomes one row for the root section plus one row per repeat
//! instance, linked back to its parent through `_index` / `_parent_index`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use odk_model::tags::{INDEX, NOTE_SEPARATOR, PARENT_INDEX, PARENT_TABLE_NAME, TAG_SEPARATOR};
use odk_model::{Attachment, CellValue, FlatRow, RecordValue, Scalar, SubmissionRecord};

use crate::attachments::AttachmentResolver;
use crate::mongo::decode_path;

/// Running 1-based instance counters, one per repeat section, shared by every
/// submission of an export.
#[derive(Debug, Clone, Default)]
pub struct RepeatIndices {
    counters: HashMap<String, i64>,
}

impl RepeatIndices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter of `section` and return the new value.
    pub fn next(&mut self, section: &str) -> i64 {
        let counter = self.counters.entry(section.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Last index handed out for `section`, zero when none was.
    pub fn current(&self, section: &str) -> i64 {
        self.counters.get(section).copied().unwrap_or(0)
    }
}

/// Media handling for one export.
#[derive(Clone, Copy, Default)]
pub struct FlattenContext<'a> {
    media_xpaths: Option<&'a BTreeSet<String>>,
    resolver: Option<&'a dyn AttachmentResolver>,
}

impl<'a> FlattenContext<'a> {
    /// Rewrite media answers listed in `media_xpaths` through `resolver`.
    pub fn with_media(media_xpaths: &'a BTreeSet<String>, resolver: &'a dyn AttachmentResolver) -> Self {
        Self {
            media_xpaths: Some(media_xpaths),
            resolver: Some(resolver),
        }
    }

    fn resolve_media(&self, key: &str, value: &Scalar, attachments: &[Attachment]) -> Option<String> {
        let (media, resolver) = (self.media_xpaths?, self.resolver?);
        if !media.contains(key) {
            return None;
        }
        resolver.resolve(value.as_text()?, attachments)
    }
}

/// Rows produced from one submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub own: FlatRow,
    /// Repeat section name to rows, in visiting order.
    pub repeats: BTreeMap<String, Vec<FlatRow>>,
}

impl Flattened {
    fn extend(&mut self, other: Flattened, section: &str) {
        self.repeats
            .entry(section.to_string())
            .or_default()
            .push(other.own);
        for (name, rows) in other.repeats {
            self.repeats.entry(name).or_default().extend(rows);
        }
    }

    /// Total number of rows, root row included.
    pub fn row_count(&self) -> usize {
        1 + self.repeats.values().map(Vec::len).sum::<usize>()
    }
}

fn scalar_text(scalar: &Scalar) -> String {
    CellValue::from(scalar).to_display()
}

/// Flatten a submission.
///
/// The root row receives `_index = running_index` and `_parent_index = -1`.
pub fn flatten(
    record: &SubmissionRecord,
    running_index: i64,
    indices: &mut RepeatIndices,
    section: &str,
    ctx: &FlattenContext<'_>,
) -> Flattened {
    let mut flattened = flatten_record(record, running_index, indices, section, ctx, record.attachments());
    flattened.own.insert(INDEX.to_string(), CellValue::Int(running_index));
    flattened.own.insert(PARENT_INDEX.to_string(), CellValue::Int(-1));
    flattened
}

fn flatten_record(
    record: &SubmissionRecord,
    running_index: i64,
    indices: &mut RepeatIndices,
    section: &str,
    ctx: &FlattenContext<'_>,
    attachments: &[Attachment],
) -> Flattened {
    let mut flattened = Flattened::default();
    for (key, value) in record.iter() {
        let cell = match value {
            RecordValue::Scalar(scalar) => match ctx.resolve_media(key, scalar, attachments) {
                Some(uri) => CellValue::Text(uri),
                None => CellValue::from(scalar),
            },
            RecordValue::Repeat(items) => {
                let child_section = decode_path(key);
                for item in items {
                    let child_index = indices.next(&child_section);
                    let mut child =
                        flatten_record(item, child_index, indices, &child_section, ctx, attachments);
                    let mut own = FlatRow::from([
                        (INDEX.to_string(), CellValue::Int(child_index)),
                        (PARENT_INDEX.to_string(), CellValue::Int(running_index)),
                        (PARENT_TABLE_NAME.to_string(), CellValue::from(section)),
                    ]);
                    own.append(&mut child.own);
                    child.own = own;
                    flattened.extend(child, &child_section);
                }
                continue;
            }
            RecordValue::List(items) => CellValue::Text(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(scalar_text)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            RecordValue::Tags(tags) => CellValue::Text(tags.join(TAG_SEPARATOR)),
            RecordValue::Notes(notes) => CellValue::Text(notes.join(NOTE_SEPARATOR)),
            RecordValue::Attachments(_) => continue,
        };
        flattened.own.insert(key.to_string(), cell);
    }
    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::HostAttachmentResolver;

    fn child(name: &str) -> SubmissionRecord {
        SubmissionRecord::new().with("children/name", name)
    }

    #[test]
    fn repeat_rows_link_to_parent() {
        let record = SubmissionRecord::new()
            .with("name", "Abe")
            .with("children", vec![child("Mike"), child("Amy")]);
        let mut indices = RepeatIndices::new();
        let flattened = flatten(&record, 1, &mut indices, "children_survey", &FlattenContext::default());

        assert_eq!(flattened.own["_index"], CellValue::Int(1));
        assert_eq!(flattened.own["_parent_index"], CellValue::Int(-1));
        assert!(!flattened.own.contains_key("children"));
        let rows = &flattened.repeats["children"];
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["_index"], CellValue::Int(2));
        assert_eq!(rows[1]["_parent_index"], CellValue::Int(1));
        assert_eq!(rows[1]["_parent_table_name"], CellValue::from("children_survey"));
        assert_eq!(rows[1]["children/name"], CellValue::from("Amy"));
        assert_eq!(flattened.row_count(), 3);
    }

    #[test]
    fn nested_repeats_use_their_parent_instance() {
        let cartoon = SubmissionRecord::new().with("children/cartoons/name", "Tom");
        let kid = child("Mike").with("children/cartoons", vec![cartoon.clone(), cartoon]);
        let record = SubmissionRecord::new().with("children", vec![child("Zoe"), kid]);
        let mut indices = RepeatIndices::new();
        let flattened = flatten(&record, 1, &mut indices, "survey", &FlattenContext::default());

        let cartoons = &flattened.repeats["children/cartoons"];
        assert_eq!(cartoons.len(), 2);
        assert_eq!(cartoons[0]["_parent_index"], CellValue::Int(2));
        assert_eq!(cartoons[0]["_parent_table_name"], CellValue::from("children"));
        assert_eq!(indices.current("children"), 2);
        assert_eq!(indices.current("children/cartoons"), 2);
    }

    #[test]
    fn special_values_are_joined() {
        let record = SubmissionRecord::new()
            .with("_tags", RecordValue::Tags(vec!["hot".into(), "dry".into()]))
            .with("_notes", RecordValue::Notes(vec!["one".into(), "two".into()]))
            .with(
                "_geolocation",
                RecordValue::List(vec![Scalar::Float(1.5), Scalar::Float(36.0)]),
            )
            .with("_attachments", RecordValue::Attachments(Vec::new()));
        let flattened = flatten(&record, 1, &mut RepeatIndices::new(), "s", &FlattenContext::default());
        assert_eq!(flattened.own["_tags"], CellValue::from("hot,dry"));
        assert_eq!(flattened.own["_notes"], CellValue::from("one\r\ntwo"));
        assert_eq!(flattened.own["_geolocation"], CellValue::from("1.5 36.0"));
        assert!(!flattened.own.contains_key("_attachments"));
    }

    #[test]
    fn media_answers_resolve_in_repeats() {
        let attachments = vec![Attachment {
            filename: "bob/attachments/1.jpg".to_string(),
            download_url: Some("/media/1.jpg".to_string()),
            mimetype: None,
        }];
        let photo = SubmissionRecord::new().with("items/photo", "1.jpg");
        let record = SubmissionRecord::new()
            .with("items", vec![photo])
            .with("_attachments", RecordValue::Attachments(attachments));
        let media = BTreeSet::from(["items/photo".to_string()]);
        let resolver = HostAttachmentResolver::new(Some("http://host".to_string()));
        let ctx = FlattenContext::with_media(&media, &resolver);
        let flattened = flatten(&record, 1, &mut RepeatIndices::new(), "s", &ctx);
        assert_eq!(
            flattened.repeats["items"][0]["items/photo"],
            CellValue::from("http://host/media/1.jpg")
        );
    }
}
