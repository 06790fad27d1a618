//! Tests for odk-model types.

use odk_model::{
    ExportError, ExportOptions, FieldNode, FormSchema, GroupDelimiter, GroupNode, Label,
    QuestionType, SchemaNode,
};

#[test]
fn options_load_from_toml() {
    let text = r#"
        binary_select_multiples = true
        truncate_group_title = true
        group_delimiter = "."
        na_rep = ""

        [index_tags]
        open = "{"
        close = "}"
    "#;
    let options: ExportOptions = toml::from_str(text).expect("parse options");
    assert!(options.split_select_multiples);
    assert!(options.binary_select_multiples);
    assert!(options.truncate_group_title);
    assert!(!options.remove_group_name);
    assert!(options.truncates_group_titles());
    assert_eq!(options.group_delimiter, GroupDelimiter::Dot);
    assert_eq!(options.na_rep, "");
    assert_eq!(options.index_tags.open, "{");
}

#[test]
fn options_round_trip_through_json() {
    let options = ExportOptions::new()
        .with_labels(true)
        .with_language("French");
    let json = serde_json::to_string(&options).expect("serialize options");
    let round: ExportOptions = serde_json::from_str(&json).expect("deserialize options");
    assert_eq!(round, options);
}

#[test]
fn schema_languages_are_sorted_and_unique() {
    let label = |pairs: &[(&str, &str)]| {
        Label::Translations(
            pairs
                .iter()
                .map(|(lang, text)| (lang.to_string(), text.to_string()))
                .collect(),
        )
    };
    let schema = FormSchema::new(
        "survey",
        vec![
            SchemaNode::Field(
                FieldNode::new("name", "name", QuestionType::Text)
                    .with_label(label(&[("French", "Nom"), ("English", "Name")])),
            ),
            SchemaNode::Repeat(GroupNode::new(
                "kids",
                "kids",
                vec![SchemaNode::Field(
                    FieldNode::new("age", "kids/age", QuestionType::Integer)
                        .with_label(label(&[("Arabic", "العمر")])),
                )],
            )),
        ],
    );
    assert_eq!(schema.languages(), vec!["Arabic", "English", "French"]);
    let xpaths: Vec<&str> = schema.fields().iter().map(|f| f.xpath.as_str()).collect();
    assert_eq!(xpaths, vec!["name", "kids/age"]);
}

#[test]
fn no_records_is_advisory() {
    let err = ExportError::NoRecordsFound {
        form: "survey".to_string(),
    };
    assert!(!err.is_fatal());
    assert!(ExportError::schema("duplicate xpath").is_fatal());
    assert_eq!(err.to_string(), "no records found for form `survey`");
}
