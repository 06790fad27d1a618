//! Every export target written to disk and read back.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use odk_core::ExportResult;
use odk_ingest::{RecordCursor, parse_form_schema};
use odk_model::{ExportError, ExportOptions, FormSchema};
use odk_output::{ExportFormat, build_export};
use serde_json::{Value, json};

const FORM: &str = r#"{
    "name": "tutorial",
    "title": "Tutorial",
    "children": [
        {"type": "text", "name": "name", "label": "Name"},
        {"type": "integer", "name": "age", "label": "Age"},
        {"type": "select one", "name": "rating", "label": "Rating", "choices": [
            {"name": "1", "label": "Poor"},
            {"name": "2", "label": "Good"}
        ]},
        {"type": "repeat", "name": "children", "children": [
            {"type": "text", "name": "name", "label": "Child name"}
        ]}
    ]
}"#;

fn form() -> FormSchema {
    parse_form_schema(FORM).expect("parse form")
}

fn submissions() -> Vec<Value> {
    vec![json!({
        "_id": 7,
        "name": "Abe",
        "age": "35",
        "rating": "2",
        "children": [{"children/name": "Mike"}, {"children/name": "John"}]
    })]
}

fn export(format: ExportFormat, file_name: &str, records: Vec<Value>) -> (tempfile::TempDir, ExportResult) {
    let dir = tempfile::tempdir().expect("tempdir");
    let destination = dir.path().join(file_name);
    let result = build_export(
        &form(),
        &ExportOptions::default(),
        RecordCursor::from_values(records),
        &destination,
        format,
        &(),
    )
    .expect("export");
    (dir, result)
}

fn zip_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(File::open(path).expect("open")).expect("zip");
    let mut entry = archive.by_name(name).expect("entry");
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).expect("read entry");
    bytes
}

#[test]
fn csv_zip_has_one_entry_per_section() {
    let (dir, result) = export(ExportFormat::CsvZip, "tutorial.zip", submissions());
    assert_eq!(result.submissions, 1);
    assert_eq!(result.total_rows(), 3);

    let path = dir.path().join("tutorial.zip");
    let archive = zip::ZipArchive::new(File::open(&path).expect("open")).expect("zip");
    assert_eq!(archive.len(), 2);

    let children = String::from_utf8(zip_entry(&path, "children.csv")).expect("utf8");
    insta::assert_snapshot!(children, @r"
    children/name,_id,_uuid,_submission_time,_index,_parent_table_name,_parent_index,_tags,_notes,_version,_duration,_submitted_by
    Mike,n/a,n/a,n/a,1,tutorial,1,n/a,n/a,n/a,n/a,n/a
    John,n/a,n/a,n/a,2,tutorial,1,n/a,n/a,n/a,n/a,n/a
    ");

    let root = String::from_utf8(zip_entry(&path, "tutorial.csv")).expect("utf8");
    let mut lines = root.lines();
    assert!(lines.next().expect("header").starts_with("name,age,rating,_id,"));
    assert!(lines.next().expect("row").starts_with("Abe,35,2,7,"));
}

#[test]
fn xlsx_has_one_worksheet_per_section() {
    let (dir, result) = export(ExportFormat::Xlsx, "tutorial.xlsx", submissions());
    let names: Vec<&str> = result.sections.iter().map(|(_, name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["tutorial", "children"]);

    let path = dir.path().join("tutorial.xlsx");
    let workbook = String::from_utf8(zip_entry(&path, "xl/workbook.xml")).expect("utf8");
    assert!(workbook.contains(r#"name="tutorial""#));
    assert!(workbook.contains(r#"name="children""#));
    assert!(!zip_entry(&path, "xl/worksheets/sheet2.xml").is_empty());
}

#[test]
fn sav_zip_counts_cases_per_section() {
    let (dir, _) = export(ExportFormat::SavZip, "tutorial.zip", submissions());
    let path = dir.path().join("tutorial.zip");

    let root = odk_sav::read_header(zip_entry(&path, "tutorial.sav").as_slice()).expect("header");
    assert_eq!(root.cases, Some(1));
    assert_eq!(root.file_label, "Tutorial");
    let children =
        odk_sav::read_header(zip_entry(&path, "children.sav").as_slice()).expect("header");
    assert_eq!(children.cases, Some(2));
}

#[test]
fn flat_csv_spreads_repeats() {
    let (dir, result) = export(ExportFormat::FlatCsv, "tutorial.csv", submissions());
    assert_eq!(result.sections, vec![("tutorial".to_string(), "tutorial".to_string(), 1)]);

    let text = std::fs::read_to_string(dir.path().join("tutorial.csv")).expect("read");
    let header = text.lines().next().expect("header");
    assert!(header.starts_with("name,age,rating,children[1]/name,children[2]/name,_id"));
}

#[test]
fn empty_export_writes_headers_and_reports_no_records() {
    let (dir, result) = export(ExportFormat::CsvZip, "empty.zip", Vec::new());
    assert!(matches!(
        result.check_records(),
        Err(ExportError::NoRecordsFound { .. })
    ));
    let root = String::from_utf8(zip_entry(&dir.path().join("empty.zip"), "tutorial.csv"))
        .expect("utf8");
    assert_eq!(root.lines().count(), 1);
}

const GROUPED_FORM: &str = r#"{
    "name": "visits",
    "title": "Visits",
    "children": [
        {"type": "group", "name": "location", "label": "Location", "children": [
            {"type": "text", "name": "street", "label": "Street"}
        ]}
    ]
}"#;

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[test]
fn sav_variables_use_element_names_of_grouped_questions() {
    let form = parse_form_schema(GROUPED_FORM).expect("parse form");
    let dir = tempfile::tempdir().expect("tempdir");
    let records = || RecordCursor::from_values(vec![json!({"location/street": "Main"})]);

    let sav_path = dir.path().join("visits_sav.zip");
    build_export(&form, &ExportOptions::default(), records(), &sav_path, ExportFormat::SavZip, &())
        .expect("sav export");
    let sav = zip_entry(&sav_path, "visits.sav");
    // Long variable names are stored as `SHORT=long` pairs.
    assert!(contains(&sav, b"=street"));
    assert!(!contains(&sav, b"location.street"));

    let csv_path = dir.path().join("visits_csv.zip");
    build_export(&form, &ExportOptions::default(), records(), &csv_path, ExportFormat::CsvZip, &())
        .expect("csv export");
    let csv = String::from_utf8(zip_entry(&csv_path, "visits.csv")).expect("utf8");
    assert!(csv.starts_with("location/street,"));
}
