//! Tests for loading forms, submissions and export config from disk.

use std::io::Write;
use std::path::PathBuf;

use odk_ingest::{IngestError, RecordCursor, load_export_options, load_form_schema};
use odk_model::{GroupDelimiter, QuestionType, RecordValue, SchemaNode};
use tempfile::NamedTempFile;

fn temp_file(contents: &str, suffix: &str) -> (NamedTempFile, PathBuf) {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    let path = file.path().to_path_buf();
    (file, path)
}

const FORM: &str = r##"{
    "name": "tutorial",
    "id_string": "tutorial",
    "default_language": "default",
    "type": "survey",
    "children": [
        {"type": "text", "name": "name", "label": {"English": "Name", "French": "Nom"}},
        {"type": "group", "name": "location", "children": [
            {"type": "geopoint", "name": "gps", "label": "GPS", "instance": {"hxl": "#geo"}}
        ]},
        {"type": "repeat", "name": "children", "children": [
            {"type": "text", "name": "name", "label": "Child"},
            {"type": "select all that apply", "name": "toys", "itemset": "toys",
             "choice_filter": "age > 2"}
        ]},
        {"type": "note", "name": "thanks", "label": "Thanks"}
    ],
    "choices": {
        "toys": [{"name": "ball", "label": "Ball"}, {"name": "doll", "label": "Doll"}]
    }
}"##;

#[test]
fn form_schema_xpaths_follow_nesting() {
    let (_file, path) = temp_file(FORM, ".json");
    let schema = load_form_schema(&path).expect("load form");
    assert_eq!(schema.name, "tutorial");
    assert_eq!(schema.default_language.as_deref(), Some("default"));

    let xpaths: Vec<&str> = schema.fields().iter().map(|f| f.xpath.as_str()).collect();
    assert_eq!(
        xpaths,
        vec![
            "name",
            "location/gps",
            "children/name",
            "children/toys",
            "thanks"
        ]
    );
    assert!(matches!(&schema.children[2], SchemaNode::Repeat(group) if group.xpath == "children"));

    let toys = schema.fields()[3];
    assert_eq!(toys.question_type, QuestionType::SelectMultiple);
    assert!(toys.uses_itemset());
    assert_eq!(schema.itemsets["toys"].len(), 2);
    assert_eq!(schema.fields()[1].hxl.as_deref(), Some("#geo"));
}

#[test]
fn unnamed_element_is_a_schema_error() {
    let (_file, path) = temp_file(
        r#"{"name": "x", "children": [{"type": "text", "label": "No name"}]}"#,
        ".json",
    );
    let err = load_form_schema(&path).expect_err("unnamed element");
    assert!(matches!(err, IngestError::Schema(_)));
}

#[test]
fn cursor_reads_json_arrays() {
    let (_file, path) = temp_file(
        r#"  [{"name": "Abe", "children": [{"children/name": "Mike"}]}, {"name": "Bob"}]"#,
        ".json",
    );
    let cursor = RecordCursor::open(&path).expect("open cursor");
    assert_eq!(cursor.total(), Some(2));
    let records: Vec<_> = cursor.collect::<Result<_, _>>().expect("read records");
    assert_eq!(records.len(), 2);
    assert!(matches!(records[0].get("children"), Some(RecordValue::Repeat(_))));
}

#[test]
fn cursor_reads_ndjson_and_reports_bad_lines() {
    let (_file, path) = temp_file("{\"name\": \"Abe\"}\n\n{not json}\n{\"name\": \"Cy\"}\n", ".ndjson");
    let cursor = RecordCursor::open(&path).expect("open cursor");
    assert_eq!(cursor.total(), None);
    let results: Vec<_> = cursor.collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(IngestError::Json { .. })));
    assert!(results[2].is_ok());
}

#[test]
fn export_options_from_toml() {
    let (_file, path) = temp_file(
        "include_labels = true\ngroup_delimiter = \".\"\nhost = \"https://example.org\"\n",
        ".toml",
    );
    let options = load_export_options(&path).expect("load options");
    assert!(options.include_labels);
    assert_eq!(options.group_delimiter, GroupDelimiter::Dot);
    assert_eq!(options.host.as_deref(), Some("https://example.org"));
    assert!(options.split_select_multiples);
}
