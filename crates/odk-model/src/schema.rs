//! Form schema tree.
//!
//! A form is an ordered tree of groups, repeats and fields. Every node carries
//! its abbreviated xpath (slash separated, without the form root), which is the
//! identity key used by submissions and output columns.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A label that is either a plain string or keyed by language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Translations(BTreeMap<String, String>),
}

impl Label {
    /// Languages present on this label, sorted.
    pub fn languages(&self) -> Vec<&str> {
        match self {
            Label::Text(_) => Vec::new(),
            Label::Translations(map) => map.keys().map(String::as_str).collect(),
        }
    }

    /// Resolve the label for `language`.
    ///
    /// Falls back to the first language (sorted) when the requested one is
    /// absent or unset.
    pub fn resolve(&self, language: Option<&str>) -> Option<&str> {
        match self {
            Label::Text(text) => Some(text.as_str()),
            Label::Translations(map) => language
                .and_then(|lang| map.get(lang))
                .or_else(|| map.values().next())
                .map(String::as_str),
        }
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_string())
    }
}

/// The bind type of a question, as declared in the XForm model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindType {
    String,
    Int,
    Decimal,
    Date,
    DateTime,
    Time,
    Geopoint,
    Geotrace,
    Geoshape,
    Select,
    Select1,
    Binary,
    Barcode,
    Osm,
}

impl BindType {
    pub fn as_str(self) -> &'static str {
        match self {
            BindType::String => "string",
            BindType::Int => "int",
            BindType::Decimal => "decimal",
            BindType::Date => "date",
            BindType::DateTime => "dateTime",
            BindType::Time => "time",
            BindType::Geopoint => "geopoint",
            BindType::Geotrace => "geotrace",
            BindType::Geoshape => "geoshape",
            BindType::Select => "select",
            BindType::Select1 => "select1",
            BindType::Binary => "binary",
            BindType::Barcode => "barcode",
            BindType::Osm => "osm",
        }
    }

    /// Bind types whose string values are converted to native values on export.
    pub fn is_converted(self) -> bool {
        matches!(self, BindType::Int | BindType::Decimal | BindType::Date)
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question types understood by the exporter.
///
/// Anything unknown is kept verbatim in [`QuestionType::Other`] and exported
/// as a string column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Text,
    Integer,
    Decimal,
    Range,
    Date,
    DateTime,
    Time,
    Geopoint,
    Geotrace,
    Geoshape,
    SelectOne,
    SelectMultiple,
    Photo,
    Image,
    Audio,
    Video,
    File,
    Barcode,
    Calculate,
    Acknowledge,
    Note,
    Osm,
    Start,
    End,
    Today,
    DeviceId,
    Other(String),
}

impl QuestionType {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "text" | "string" => QuestionType::Text,
            "integer" | "int" => QuestionType::Integer,
            "decimal" => QuestionType::Decimal,
            "range" => QuestionType::Range,
            "date" => QuestionType::Date,
            "dateTime" | "datetime" => QuestionType::DateTime,
            "time" => QuestionType::Time,
            "geopoint" | "gps" => QuestionType::Geopoint,
            "geotrace" => QuestionType::Geotrace,
            "geoshape" => QuestionType::Geoshape,
            "select one" | "select_one" | "select1" => QuestionType::SelectOne,
            "select all that apply" | "select_multiple" | "select" => {
                QuestionType::SelectMultiple
            }
            "photo" => QuestionType::Photo,
            "image" => QuestionType::Image,
            "audio" => QuestionType::Audio,
            "video" => QuestionType::Video,
            "file" => QuestionType::File,
            "barcode" => QuestionType::Barcode,
            "calculate" => QuestionType::Calculate,
            "acknowledge" | "trigger" => QuestionType::Acknowledge,
            "note" => QuestionType::Note,
            "osm" => QuestionType::Osm,
            "start" => QuestionType::Start,
            "end" => QuestionType::End,
            "today" => QuestionType::Today,
            "deviceid" => QuestionType::DeviceId,
            other => QuestionType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Integer => "integer",
            QuestionType::Decimal => "decimal",
            QuestionType::Range => "range",
            QuestionType::Date => "date",
            QuestionType::DateTime => "dateTime",
            QuestionType::Time => "time",
            QuestionType::Geopoint => "geopoint",
            QuestionType::Geotrace => "geotrace",
            QuestionType::Geoshape => "geoshape",
            QuestionType::SelectOne => "select one",
            QuestionType::SelectMultiple => "select all that apply",
            QuestionType::Photo => "photo",
            QuestionType::Image => "image",
            QuestionType::Audio => "audio",
            QuestionType::Video => "video",
            QuestionType::File => "file",
            QuestionType::Barcode => "barcode",
            QuestionType::Calculate => "calculate",
            QuestionType::Acknowledge => "acknowledge",
            QuestionType::Note => "note",
            QuestionType::Osm => "osm",
            QuestionType::Start => "start",
            QuestionType::End => "end",
            QuestionType::Today => "today",
            QuestionType::DeviceId => "deviceid",
            QuestionType::Other(name) => name,
        }
    }

    pub fn bind_type(&self) -> BindType {
        match self {
            QuestionType::Integer => BindType::Int,
            QuestionType::Decimal | QuestionType::Range => BindType::Decimal,
            QuestionType::Date | QuestionType::Today => BindType::Date,
            QuestionType::DateTime | QuestionType::Start | QuestionType::End => {
                BindType::DateTime
            }
            QuestionType::Time => BindType::Time,
            QuestionType::Geopoint => BindType::Geopoint,
            QuestionType::Geotrace => BindType::Geotrace,
            QuestionType::Geoshape => BindType::Geoshape,
            QuestionType::SelectOne => BindType::Select1,
            QuestionType::SelectMultiple => BindType::Select,
            QuestionType::Photo
            | QuestionType::Image
            | QuestionType::Audio
            | QuestionType::Video
            | QuestionType::File => BindType::Binary,
            QuestionType::Barcode => BindType::Barcode,
            QuestionType::Osm => BindType::Osm,
            QuestionType::Text
            | QuestionType::Calculate
            | QuestionType::Acknowledge
            | QuestionType::Note
            | QuestionType::DeviceId
            | QuestionType::Other(_) => BindType::String,
        }
    }

    /// Question types that never produce an output column.
    pub fn is_excluded(&self) -> bool {
        matches!(self, QuestionType::Note)
    }

    /// Media questions whose values can be resolved to attachment URLs.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            QuestionType::Photo | QuestionType::Image | QuestionType::Audio | QuestionType::Video
        )
    }
}

impl From<String> for QuestionType {
    fn from(value: String) -> Self {
        QuestionType::parse(&value)
    }
}

impl From<QuestionType> for String {
    fn from(value: QuestionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One option of a select question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
}

impl Choice {
    pub fn new(name: impl Into<String>, label: impl Into<Label>) -> Self {
        Self {
            name: name.into(),
            label: Some(label.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
    pub xpath: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    /// Name of a shared choice list in [`FormSchema::itemsets`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itemset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_filter: Option<String>,
    #[serde(default)]
    pub randomize: bool,
    /// HXL hashtag hint, e.g. `#beneficiary`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hxl: Option<String>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, xpath: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            name: name.into(),
            xpath: xpath.into(),
            question_type,
            label: None,
            choices: Vec::new(),
            itemset: None,
            choice_filter: None,
            randomize: false,
            hxl: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_hxl(mut self, tag: impl Into<String>) -> Self {
        self.hxl = Some(tag.into());
        self
    }

    /// Whether choices must be read from the form's itemset table instead of
    /// the static choice list.
    pub fn uses_itemset(&self) -> bool {
        self.itemset.is_some()
            && ((self.choices.is_empty() && self.choice_filter.is_some()) || self.randomize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub name: String,
    pub xpath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    pub children: Vec<SchemaNode>,
}

impl GroupNode {
    pub fn new(name: impl Into<String>, xpath: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            xpath: xpath.into(),
            label: None,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    Group(GroupNode),
    Repeat(GroupNode),
    Field(FieldNode),
}

impl SchemaNode {
    pub fn name(&self) -> &str {
        match self {
            SchemaNode::Group(group) | SchemaNode::Repeat(group) => &group.name,
            SchemaNode::Field(field) => &field.name,
        }
    }

    pub fn xpath(&self) -> &str {
        match self {
            SchemaNode::Group(group) | SchemaNode::Repeat(group) => &group.xpath,
            SchemaNode::Field(field) => &field.xpath,
        }
    }

    pub fn label(&self) -> Option<&Label> {
        match self {
            SchemaNode::Group(group) | SchemaNode::Repeat(group) => group.label.as_ref(),
            SchemaNode::Field(field) => field.label.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    /// Root element name; also the name of the root output section.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    pub children: Vec<SchemaNode>,
    /// Shared choice lists keyed by list name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub itemsets: BTreeMap<String, Vec<Choice>>,
}

impl FormSchema {
    pub fn new(name: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            title: None,
            id_string: None,
            default_language: None,
            children,
            itemsets: BTreeMap::new(),
        }
    }

    /// Every language used by any label in the form, sorted and deduplicated.
    pub fn languages(&self) -> Vec<String> {
        fn collect<'a>(nodes: &'a [SchemaNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                if let Some(label) = node.label() {
                    out.extend(label.languages());
                }
                match node {
                    SchemaNode::Group(group) | SchemaNode::Repeat(group) => {
                        collect(&group.children, out);
                    }
                    SchemaNode::Field(field) => {
                        for choice in &field.choices {
                            if let Some(label) = &choice.label {
                                out.extend(label.languages());
                            }
                        }
                    }
                }
            }
        }

        let mut languages = Vec::new();
        collect(&self.children, &mut languages);
        let mut languages: Vec<String> = languages.into_iter().map(str::to_string).collect();
        languages.sort();
        languages.dedup();
        languages
    }

    /// Depth-first iterator over all fields, in declared order.
    pub fn fields(&self) -> Vec<&FieldNode> {
        fn walk<'a>(nodes: &'a [SchemaNode], out: &mut Vec<&'a FieldNode>) {
            for node in nodes {
                match node {
                    SchemaNode::Group(group) | SchemaNode::Repeat(group) => {
                        walk(&group.children, out);
                    }
                    SchemaNode::Field(field) => out.push(field),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_resolution_falls_back_to_first_language() {
        let label = Label::Translations(BTreeMap::from([
            ("French".to_string(), "Nom".to_string()),
            ("English".to_string(), "Name".to_string()),
        ]));
        assert_eq!(label.resolve(Some("French")), Some("Nom"));
        assert_eq!(label.resolve(Some("Swahili")), Some("Name"));
        assert_eq!(label.resolve(None), Some("Name"));
    }

    #[test]
    fn question_type_parses_pyxform_names() {
        assert_eq!(
            QuestionType::parse("select all that apply"),
            QuestionType::SelectMultiple
        );
        assert_eq!(QuestionType::parse("select one"), QuestionType::SelectOne);
        assert_eq!(QuestionType::parse("integer").bind_type(), BindType::Int);
        assert_eq!(
            QuestionType::parse("hidden"),
            QuestionType::Other("hidden".to_string())
        );
        assert!(QuestionType::Note.is_excluded());
        assert!(QuestionType::Photo.is_media());
        assert!(!QuestionType::File.is_media());
    }

    #[test]
    fn itemset_only_used_for_filtered_or_randomized_choices() {
        let mut field = FieldNode::new("county", "county", QuestionType::SelectMultiple);
        field.itemset = Some("counties".to_string());
        assert!(!field.uses_itemset());
        field.choice_filter = Some("state=${state}".to_string());
        assert!(field.uses_itemset());
        field.choice_filter = None;
        field.randomize = true;
        assert!(field.uses_itemset());
    }
}
