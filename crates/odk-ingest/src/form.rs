//! Loading a [`FormSchema`] from pyxform survey JSON.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use odk_model::{Choice, FieldNode, FormSchema, GroupNode, Label, QuestionType, SchemaNode};

use crate::error::{IngestError, Result};

#[derive(Debug, Deserialize)]
struct RawSurvey {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    id_string: Option<String>,
    #[serde(default)]
    default_language: Option<String>,
    #[serde(default)]
    children: Vec<RawElement>,
    #[serde(default)]
    choices: BTreeMap<String, Vec<RawChoice>>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type", default)]
    element_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label: Option<Label>,
    #[serde(default)]
    children: Vec<RawElement>,
    #[serde(default)]
    choices: Vec<RawChoice>,
    #[serde(default)]
    itemset: Option<String>,
    #[serde(default)]
    choice_filter: Option<String>,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
    #[serde(default)]
    instance: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    name: Value,
    #[serde(default)]
    label: Option<Label>,
}

impl RawChoice {
    fn into_choice(self) -> Choice {
        let name = match self.name {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Choice {
            name,
            label: self.label,
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        Value::Number(number) => number.as_i64() == Some(1),
        _ => false,
    }
}

fn convert_children(children: Vec<RawElement>, prefix: &str) -> Result<Vec<SchemaNode>> {
    children
        .into_iter()
        .map(|child| convert_element(child, prefix))
        .collect()
}

fn convert_element(raw: RawElement, prefix: &str) -> Result<SchemaNode> {
    let name = raw
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            IngestError::Schema(format!(
                "element of type `{}` under `{}` has no name",
                raw.element_type,
                if prefix.is_empty() { "/" } else { prefix }
            ))
        })?;
    let xpath = if prefix.is_empty() {
        name.clone()
    } else {
        format!("{prefix}/{name}")
    };

    match raw.element_type.as_str() {
        "group" => Ok(SchemaNode::Group(GroupNode {
            children: convert_children(raw.children, &xpath)?,
            name,
            xpath,
            label: raw.label,
        })),
        "repeat" => Ok(SchemaNode::Repeat(GroupNode {
            children: convert_children(raw.children, &xpath)?,
            name,
            xpath,
            label: raw.label,
        })),
        other => {
            let question_type = QuestionType::parse(other);
            let is_select = matches!(
                question_type,
                QuestionType::SelectOne | QuestionType::SelectMultiple
            );
            let mut choices: Vec<Choice> =
                raw.choices.into_iter().map(RawChoice::into_choice).collect();
            if is_select && choices.is_empty() {
                choices = raw
                    .children
                    .into_iter()
                    .filter_map(|child| {
                        child.name.map(|name| Choice {
                            name,
                            label: child.label,
                        })
                    })
                    .collect();
            }
            let randomize = raw.parameters.get("randomize").is_some_and(truthy);
            let hxl = raw
                .instance
                .get("hxl")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(SchemaNode::Field(FieldNode {
                name,
                xpath,
                question_type,
                label: raw.label,
                choices,
                itemset: raw.itemset,
                choice_filter: raw.choice_filter,
                randomize,
                hxl,
            }))
        }
    }
}

/// Parse pyxform survey JSON into a [`FormSchema`].
///
/// Abbreviated xpaths are computed from the element nesting; the survey root
/// is not part of any xpath.
pub fn parse_form_schema(json: &str) -> Result<FormSchema> {
    let raw: RawSurvey = serde_json::from_str(json).map_err(|source| IngestError::Json {
        context: "form schema".to_string(),
        source,
    })?;
    if raw.name.trim().is_empty() {
        return Err(IngestError::Schema("survey has no name".to_string()));
    }
    let children = convert_children(raw.children, "")?;
    let itemsets = raw
        .choices
        .into_iter()
        .map(|(list, choices)| {
            (
                list,
                choices.into_iter().map(RawChoice::into_choice).collect(),
            )
        })
        .collect();
    Ok(FormSchema {
        name: raw.name,
        title: raw.title,
        id_string: raw.id_string,
        default_language: raw.default_language,
        children,
        itemsets,
    })
}

pub fn load_form_schema(path: &Path) -> Result<FormSchema> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let schema = parse_form_schema(&text)?;
    debug!(
        path = %path.display(),
        form = %schema.name,
        fields = schema.fields().len(),
        "loaded form schema"
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_children_become_choices() {
        let json = r#"{
            "name": "data",
            "children": [
                {"type": "select all that apply", "name": "colors", "label": "Colors",
                 "children": [{"name": "red", "label": "Red"}, {"name": "blue", "label": "Blue"}]}
            ]
        }"#;
        let schema = parse_form_schema(json).expect("parse schema");
        let fields = schema.fields();
        assert_eq!(fields[0].question_type, QuestionType::SelectMultiple);
        assert_eq!(fields[0].choices.len(), 2);
        assert_eq!(fields[0].choices[1].name, "blue");
    }

    #[test]
    fn numeric_choice_names_are_kept_as_text() {
        let json = r#"{
            "name": "data",
            "children": [{"type": "select one", "name": "yn", "choices": [{"name": 1, "label": "Yes"}]}]
        }"#;
        let schema = parse_form_schema(json).expect("parse schema");
        assert_eq!(schema.fields()[0].choices[0].name, "1");
    }

    #[test]
    fn randomize_parameter_accepts_strings() {
        assert!(truthy(&Value::String("true".to_string())));
        assert!(truthy(&Value::String("Yes".to_string())));
        assert!(!truthy(&Value::String("false".to_string())));
        assert!(truthy(&Value::Bool(true)));
    }
}
