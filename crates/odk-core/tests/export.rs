//! End-to-end tests: form JSON and submissions in, per-sheet rows out.

use odk_core::{
    ExportBuilder, FlatTableBuilder, IndexedSchema, SheetLayout, SheetNaming, SheetSink, index,
};
use odk_ingest::{RecordCursor, parse_form_schema};
use odk_model::{CellValue, ExportOptions, FlatRow, FormSchema, Result};
use serde_json::{Value, json};

const FORM: &str = r#"{
    "name": "tutorial",
    "children": [
        {"type": "text", "name": "name", "label": "Name"},
        {"type": "integer", "name": "age", "label": "Age"},
        {"type": "repeat", "name": "children", "children": [
            {"type": "text", "name": "name", "label": "Child name"},
            {"type": "select all that apply", "name": "fav_colors", "choices": [
                {"name": "red", "label": "Red"},
                {"name": "blue", "label": "Blue"},
                {"name": "pink", "label": "Pink"}
            ]},
            {"type": "repeat", "name": "cartoons", "children": [
                {"type": "text", "name": "name", "label": "Cartoon"}
            ]}
        ]},
        {"type": "group", "name": "geo", "children": [
            {"type": "geopoint", "name": "gps", "label": "Location"}
        ]}
    ]
}"#;

fn form() -> FormSchema {
    parse_form_schema(FORM).expect("parse form")
}

#[derive(Default)]
struct MemorySink {
    layouts: Vec<SheetLayout>,
    rows: Vec<Vec<FlatRow>>,
}

impl MemorySink {
    fn sheet(&self, name: &str) -> &[FlatRow] {
        let position = self
            .layouts
            .iter()
            .position(|layout| layout.name == name)
            .expect("sheet exists");
        &self.rows[position]
    }
}

impl SheetSink for MemorySink {
    fn naming(&self) -> SheetNaming {
        SheetNaming::File
    }

    fn begin(&mut self, _schema: &IndexedSchema, layouts: &[SheetLayout]) -> Result<()> {
        self.layouts = layouts.to_vec();
        self.rows = vec![Vec::new(); layouts.len()];
        Ok(())
    }

    fn write_row(&mut self, sheet: usize, row: &FlatRow) -> Result<()> {
        self.rows[sheet].push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

fn export(options: ExportOptions, submissions: Vec<Value>) -> MemorySink {
    let builder = ExportBuilder::new(&form(), options).expect("builder");
    let mut sink = MemorySink::default();
    builder
        .export(RecordCursor::from_values(submissions), &mut sink, &())
        .expect("export");
    sink
}

fn kids(names: &[&str]) -> Value {
    Value::Array(names.iter().map(|name| json!({"children/name": name})).collect())
}

#[test]
fn root_and_children_sheets() {
    let sink = export(
        ExportOptions::default(),
        vec![json!({"name": "Abe", "age": "35", "children": kids(&["Mike", "John"])})],
    );

    let root = sink.sheet("tutorial");
    assert_eq!(root.len(), 1);
    assert_eq!(root[0]["name"], CellValue::from("Abe"));
    assert_eq!(root[0]["age"], CellValue::Int(35));
    assert_eq!(root[0]["_index"], CellValue::Int(1));
    assert_eq!(root[0]["_parent_index"], CellValue::Int(-1));

    let children = sink.sheet("children");
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["children/name"], CellValue::from("Mike"));
    assert_eq!(children[0]["_index"], CellValue::Int(1));
    assert_eq!(children[0]["_parent_index"], CellValue::Int(1));
    assert_eq!(children[1]["children/name"], CellValue::from("John"));
    assert_eq!(children[1]["_index"], CellValue::Int(2));
    assert_eq!(children[1]["_parent_table_name"], CellValue::from("tutorial"));
}

#[test]
fn repeat_indices_continue_across_submissions() {
    let sink = export(
        ExportOptions::default(),
        vec![
            json!({"name": "Abe", "children": kids(&["a", "b", "c"])}),
            json!({"name": "Bob", "children": kids(&["d", "e", "f"])}),
        ],
    );
    let children = sink.sheet("children");
    let indices: Vec<_> = children.iter().map(|row| row["_index"].clone()).collect();
    let expected: Vec<_> = (1..=6).map(CellValue::Int).collect();
    assert_eq!(indices, expected);
    assert_eq!(children[3]["_parent_index"], CellValue::Int(2));
}

#[test]
fn nested_repeats_get_their_own_sheet() {
    let sink = export(
        ExportOptions::default(),
        vec![json!({"children": [
            {"children/name": "Mike", "children/cartoons": [
                {"children/cartoons/name": "Tom"},
                {"children/cartoons/name": "Jerry"}
            ]}
        ]})],
    );
    let cartoons = sink.sheet("children_cartoons");
    assert_eq!(cartoons.len(), 2);
    assert_eq!(cartoons[1]["children/cartoons/name"], CellValue::from("Jerry"));
    assert_eq!(cartoons[1]["_parent_table_name"], CellValue::from("children"));
    assert_eq!(cartoons[1]["_parent_index"], CellValue::Int(1));
}

#[test]
fn select_multiples_and_geopoints_are_split_in_every_section() {
    let sink = export(
        ExportOptions::default(),
        vec![json!({
            "geo/gps": "1.0 36.1 2000 20",
            "children": [
                {"children/name": "Mike", "children/fav_colors": "red blue"},
                {"children/name": "Amy"}
            ]
        })],
    );
    let root = &sink.sheet("tutorial")[0];
    assert_eq!(root["geo/_gps_latitude"], CellValue::Float(1.0));
    assert_eq!(root["geo/_gps_altitude"], CellValue::Float(2000.0));
    assert_eq!(root["geo/gps"], CellValue::from("1.0 36.1 2000 20"));

    let children = sink.sheet("children");
    assert_eq!(children[0]["children/fav_colors/red"], CellValue::Bool(true));
    assert_eq!(children[0]["children/fav_colors/pink"], CellValue::Bool(false));
    assert_eq!(children[1]["children/fav_colors/red"], CellValue::Null);
}

#[test]
fn indexing_is_idempotent() {
    let options = ExportOptions::default();
    let first = index(&form(), &options).expect("index");
    let second = index(&form(), &options).expect("index");
    assert_eq!(first.sections(), second.sections());

    let names: Vec<&str> = first.sections().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["tutorial", "children", "children/cartoons"]);
    let root: Vec<&str> = first.root_section().columns.iter().map(|c| c.xpath.as_str()).collect();
    assert_eq!(
        root,
        vec![
            "name",
            "age",
            "geo/gps",
            "geo/_gps_latitude",
            "geo/_gps_longitude",
            "geo/_gps_altitude",
            "geo/_gps_precision"
        ]
    );
}

#[test]
fn empty_export_still_has_layouts() {
    let sink = export(ExportOptions::default(), Vec::new());
    assert_eq!(sink.layouts.len(), 3);
    assert!(sink.rows.iter().all(Vec::is_empty));
}

fn render(table: &odk_core::FlatTable) -> String {
    table
        .header_rows
        .iter()
        .chain(&table.rows)
        .map(|row| row.join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn flat_table_spreads_repeats_into_indexed_columns() {
    let mut options = ExportOptions::default();
    options.columns = Some(vec!["name".to_string(), "children".to_string(), "_id".to_string()]);
    let mut builder = FlatTableBuilder::new(&form(), options).expect("flat builder");
    for value in [
        json!({"_id": 1, "name": "Abe", "children": [
            {"children/name": "Mike", "children/cartoons": [{"children/cartoons/name": "Tom"}]},
            {"children/name": "John"}
        ]}),
        json!({"_id": 2, "name": "Bob"}),
    ] {
        let record = odk_ingest::record_from_json(value, 1).expect("record");
        builder.push(&record);
    }
    assert_eq!(builder.submissions(), 2);

    let table = builder.finish();
    insta::assert_snapshot!(render(&table), @r"
    name,children[1]/name,children[1]/fav_colors/red,children[1]/fav_colors/blue,children[1]/fav_colors/pink,children[2]/name,children[2]/fav_colors/red,children[2]/fav_colors/blue,children[2]/fav_colors/pink,children[1]/cartoons[1]/name,_id
    Abe,Mike,n/a,n/a,n/a,John,n/a,n/a,n/a,Tom,1
    Bob,n/a,n/a,n/a,n/a,n/a,n/a,n/a,n/a,n/a,2
    ");
}

#[test]
fn mongo_encoded_keys_are_decoded_into_their_columns() {
    let form = parse_form_schema(
        r#"{
            "name": "prices",
            "children": [
                {"type": "text", "name": "price.usd", "label": "Price in USD"},
                {"type": "text", "name": "$discount", "label": "Discount"}
            ]
        }"#,
    )
    .expect("parse form");
    let builder = ExportBuilder::new(&form, ExportOptions::default()).expect("builder");
    let encoded: Vec<&str> = builder
        .schema()
        .root_section()
        .encoded_fields
        .iter()
        .map(|(_, encoded)| encoded.as_str())
        .collect();
    assert_eq!(encoded, vec!["priceLg==usd", "JA==discount"]);

    let mut sink = MemorySink::default();
    builder
        .export(
            RecordCursor::from_values(vec![json!({"priceLg==usd": "12", "JA==discount": "2"})]),
            &mut sink,
            &(),
        )
        .expect("export");

    let row = &sink.sheet("prices")[0];
    assert_eq!(row["price.usd"], CellValue::from("12"));
    assert_eq!(row["$discount"], CellValue::from("2"));
    assert!(!row.contains_key("priceLg==usd"));
}
