//! Row normalization: key decoding, select-multiple and geopoint splitting,
//! type coercion and `${field}` substitution.

use std::sync::LazyLock;

use regex::Regex;

use odk_model::tags::SUBMISSION_TIME;
use odk_model::{CellValue, ExportOptions, FlatRow};

use crate::coerce::{coerce, coerce_submission_time};
use crate::indexer::{GeopointSet, IndexedSchema, Section, SelectMultipleSet};

/// `${name}` references inside text answers.
static DYNAMIC_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("Invalid dynamic value regex"));

/// How split select-multiple choice columns are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMultiplePolicy {
    /// `True`/`False`, or null when the question has no value at all.
    #[default]
    Boolean,
    /// `1`/`0`.
    Binary,
    /// The choice name (or label) when selected, null otherwise.
    Value,
}

impl SelectMultiplePolicy {
    pub fn from_options(options: &ExportOptions) -> Self {
        if options.value_select_multiples {
            SelectMultiplePolicy::Value
        } else if options.binary_select_multiples {
            SelectMultiplePolicy::Binary
        } else {
            SelectMultiplePolicy::Boolean
        }
    }
}

/// Move values stored under escaped keys back to their xpath.
///
/// A literal xpath already present in the row is left alone.
pub fn decode_encoded_fields(row: &mut FlatRow, encoded_fields: &[(String, String)]) {
    for (xpath, encoded) in encoded_fields {
        if row.contains_key(xpath) {
            continue;
        }
        if let Some(value) = row.remove(encoded) {
            row.insert(xpath.clone(), value);
        }
    }
}

/// Expand select-multiple answers into one column per choice.
///
/// The original answer is removed from the row. `choice_label` maps a choice
/// to the text written under [`SelectMultiplePolicy::Value`].
pub fn split_select_multiples(
    row: &mut FlatRow,
    sets: &[SelectMultipleSet],
    policy: SelectMultiplePolicy,
    choice_label: &dyn Fn(&SelectMultipleSet, &str) -> Option<String>,
) {
    for set in sets {
        let original = row.remove(&set.xpath);
        let answered = original.as_ref().is_some_and(|value| !value.is_null());
        let selected: Vec<String> = original
            .as_ref()
            .filter(|value| !value.is_null())
            .map(|value| {
                value
                    .to_display()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        for choice in &set.choices {
            let is_selected = selected.iter().any(|name| *name == choice.name);
            let cell = match policy {
                SelectMultiplePolicy::Binary => CellValue::Int(i64::from(is_selected)),
                SelectMultiplePolicy::Boolean if answered => CellValue::Bool(is_selected),
                SelectMultiplePolicy::Boolean => CellValue::Null,
                SelectMultiplePolicy::Value if is_selected => CellValue::Text(
                    choice_label(set, &choice.name).unwrap_or_else(|| choice.name.clone()),
                ),
                SelectMultiplePolicy::Value => CellValue::Null,
            };
            row.insert(choice.xpath.clone(), cell);
        }
    }
}

/// Split `lat lon alt precision` strings into their component columns.
///
/// Anything other than exactly four tokens leaves the components unset. The
/// original value is kept.
pub fn split_geopoints(row: &mut FlatRow, sets: &[GeopointSet]) {
    for set in sets {
        let Some(value) = row.get(&set.xpath).and_then(CellValue::as_text) else {
            continue;
        };
        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() != set.components.len() {
            continue;
        }
        let parts: Vec<String> = parts.into_iter().map(str::to_string).collect();
        for (xpath, part) in set.components.iter().zip(parts) {
            row.insert(xpath.clone(), CellValue::Text(part));
        }
    }
}

/// Replace the choice names of select answers at `xpaths` with their labels.
///
/// Names without a label are kept.
pub fn label_select_answers<'x>(
    row: &mut FlatRow,
    xpaths: impl IntoIterator<Item = &'x str>,
    choice_label: &dyn Fn(&str, &str) -> Option<String>,
) {
    for xpath in xpaths {
        let Some(value) = row.get(xpath).filter(|v| !v.is_blank()) else {
            continue;
        };
        let labelled = value
            .to_display()
            .split_whitespace()
            .map(|name| choice_label(xpath, name).unwrap_or_else(|| name.to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        row.insert(xpath.to_string(), CellValue::Text(labelled));
    }
}

/// Replace `${name}` references in text cells with the row's value for `name`.
pub fn substitute_dynamic_values(row: &mut FlatRow) {
    let updates: Vec<(String, String)> = row
        .iter()
        .filter_map(|(key, value)| {
            let text = value.as_text()?;
            if !DYNAMIC_VALUE.is_match(text) {
                return None;
            }
            let replaced = DYNAMIC_VALUE.replace_all(text, |caps: &regex::Captures<'_>| {
                row.get(&caps[1])
                    .filter(|value| !value.is_blank())
                    .map_or_else(|| caps[0].to_string(), CellValue::to_display)
            });
            Some((key.clone(), replaced.into_owned()))
        })
        .collect();
    for (key, value) in updates {
        row.insert(key, CellValue::Text(value));
    }
}

/// Applies every per-row step for one section, in order.
#[derive(Debug, Clone, Copy)]
pub struct RowTransformer<'a> {
    schema: &'a IndexedSchema,
    options: &'a ExportOptions,
    policy: SelectMultiplePolicy,
}

impl<'a> RowTransformer<'a> {
    pub fn new(schema: &'a IndexedSchema, options: &'a ExportOptions) -> Self {
        Self {
            schema,
            options,
            policy: SelectMultiplePolicy::from_options(options),
        }
    }

    fn choice_text(&self, question: &str, name: &str) -> Option<String> {
        self.schema.choice_label(question, name)
    }

    fn label_answers(&self, row: &mut FlatRow, section: &Section) {
        let unsplit = section
            .select_multiples
            .iter()
            .filter(|_| !self.options.split_select_multiples)
            .map(|set| set.xpath.as_str());
        let xpaths = section.select_ones.iter().map(String::as_str).chain(unsplit);
        label_select_answers(row, xpaths, &|xpath: &str, name: &str| {
            self.choice_text(xpath, name)
        });
    }

    pub fn transform(&self, mut row: FlatRow, section: &Section) -> FlatRow {
        decode_encoded_fields(&mut row, &section.encoded_fields);

        if self.options.split_select_multiples {
            let show_labels = self.options.show_choice_labels;
            let label = |set: &SelectMultipleSet, name: &str| {
                show_labels
                    .then(|| self.choice_text(&set.xpath, name))
                    .flatten()
            };
            split_select_multiples(&mut row, &section.select_multiples, self.policy, &label);
        }
        split_geopoints(&mut row, &section.geopoints);
        if self.options.show_choice_labels {
            self.label_answers(&mut row, section);
        }

        for column in &section.columns {
            if let Some(value) = row.remove(&column.xpath) {
                let value = if value.is_blank() {
                    value
                } else {
                    coerce(value, column.column_type)
                };
                row.insert(column.xpath.clone(), value);
            }
        }
        if let Some(value) = row.remove(SUBMISSION_TIME) {
            row.insert(SUBMISSION_TIME.to_string(), coerce_submission_time(value));
        }

        substitute_dynamic_values(&mut row);
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ChoiceColumn;

    fn colors() -> SelectMultipleSet {
        SelectMultipleSet {
            xpath: "children/fav_colors".to_string(),
            choices: ["red", "blue", "pink"]
                .into_iter()
                .map(|name| ChoiceColumn {
                    xpath: format!("children/fav_colors/{name}"),
                    name: name.to_string(),
                    label: name.to_string(),
                })
                .collect(),
        }
    }

    fn no_labels(_: &SelectMultipleSet, _: &str) -> Option<String> {
        None
    }

    fn row(pairs: &[(&str, CellValue)]) -> FlatRow {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn boolean_split_distinguishes_absent_from_empty() {
        let mut answered = row(&[("children/fav_colors", "red blue".into())]);
        split_select_multiples(&mut answered, &[colors()], SelectMultiplePolicy::Boolean, &no_labels);
        assert!(!answered.contains_key("children/fav_colors"));
        assert_eq!(answered["children/fav_colors/red"], CellValue::Bool(true));
        assert_eq!(answered["children/fav_colors/blue"], CellValue::Bool(true));
        assert_eq!(answered["children/fav_colors/pink"], CellValue::Bool(false));

        let mut empty = row(&[("children/fav_colors", "".into())]);
        split_select_multiples(&mut empty, &[colors()], SelectMultiplePolicy::Boolean, &no_labels);
        assert_eq!(empty["children/fav_colors/red"], CellValue::Bool(false));

        let mut absent = FlatRow::new();
        split_select_multiples(&mut absent, &[colors()], SelectMultiplePolicy::Boolean, &no_labels);
        assert_eq!(absent["children/fav_colors/red"], CellValue::Null);
        assert_eq!(absent["children/fav_colors/pink"], CellValue::Null);
    }

    #[test]
    fn binary_and_value_policies() {
        let mut binary = row(&[("children/fav_colors", "red blue".into())]);
        split_select_multiples(&mut binary, &[colors()], SelectMultiplePolicy::Binary, &no_labels);
        assert_eq!(binary["children/fav_colors/red"], CellValue::Int(1));
        assert_eq!(binary["children/fav_colors/pink"], CellValue::Int(0));

        let mut values = row(&[("children/fav_colors", "pink".into())]);
        split_select_multiples(&mut values, &[colors()], SelectMultiplePolicy::Value, &no_labels);
        assert_eq!(values["children/fav_colors/pink"], CellValue::from("pink"));
        assert_eq!(values["children/fav_colors/red"], CellValue::Null);
    }

    #[test]
    fn geopoint_needs_exactly_four_tokens() {
        let set = GeopointSet {
            xpath: "geo/gps".to_string(),
            components: crate::indexer::geopoint_component_xpaths("geo/gps"),
        };
        let mut full = row(&[("geo/gps", "1.0 36.1 2000 20".into())]);
        split_geopoints(&mut full, std::slice::from_ref(&set));
        assert_eq!(full["geo/_gps_latitude"], CellValue::from("1.0"));
        assert_eq!(full["geo/_gps_precision"], CellValue::from("20"));
        assert_eq!(full["geo/gps"], CellValue::from("1.0 36.1 2000 20"));

        let mut empty = row(&[("geo/gps", "".into())]);
        split_geopoints(&mut empty, std::slice::from_ref(&set));
        assert_eq!(empty.len(), 1);

        let mut partial = row(&[("geo/gps", "1.0 36.1".into())]);
        split_geopoints(&mut partial, std::slice::from_ref(&set));
        assert!(!partial.contains_key("geo/_gps_latitude"));
    }

    #[test]
    fn decode_never_overwrites_literal_key() {
        let encoded = vec![("a.b".to_string(), "aLg==b".to_string())];
        let mut fresh = row(&[("aLg==b", "x".into())]);
        decode_encoded_fields(&mut fresh, &encoded);
        assert_eq!(fresh["a.b"], CellValue::from("x"));
        assert!(!fresh.contains_key("aLg==b"));

        let mut clash = row(&[("aLg==b", "x".into()), ("a.b", "literal".into())]);
        decode_encoded_fields(&mut clash, &encoded);
        assert_eq!(clash["a.b"], CellValue::from("literal"));
    }

    #[test]
    fn dynamic_values_are_substituted() {
        let mut values = row(&[
            ("name", "Abe".into()),
            ("greeting", "Hello ${name}, ${missing}".into()),
        ]);
        substitute_dynamic_values(&mut values);
        assert_eq!(values["greeting"], CellValue::from("Hello Abe, ${missing}"));
    }
}
