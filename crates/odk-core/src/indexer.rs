//! Schema indexing.
//!
//! One depth-first walk over the form produces the ordered output sections
//! and, per section, the side tables the row transformer needs: select-multiple
//! choice columns, geopoint component columns, select-one fields and the
//! escaped forms of keys the document store cannot hold.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use odk_model::tags::{EXTRA_FIELDS, GEOPOINT_SUFFIXES, REVIEW_FIELDS};
use odk_model::{
    BindType, Choice, ExportError, ExportOptions, FieldNode, FormSchema, GroupDelimiter,
    QuestionType, Result, SchemaNode,
};

use crate::labels::LabelResolver;
use crate::mongo::{encode_path, is_invalid_for_mongo};

/// Where a column comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Question,
    /// A split select-multiple choice.
    Choice { question: String, name: String },
    /// A derived geopoint component.
    GeopointComponent { parent: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub xpath: String,
    pub title: String,
    pub label: String,
    pub column_type: BindType,
    pub kind: ColumnKind,
    pub hxl: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceColumn {
    /// `{question_xpath}/{choice_name}`
    pub xpath: String,
    pub name: String,
    /// Resolved choice label, or the column title when the choice has none.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMultipleSet {
    pub xpath: String,
    /// Empty when select multiples are not split.
    pub choices: Vec<ChoiceColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeopointSet {
    pub xpath: String,
    /// Latitude, longitude, altitude, precision.
    pub components: [String; 4],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Form name for the root section, the repeat xpath otherwise.
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub select_multiples: Vec<SelectMultipleSet>,
    pub geopoints: Vec<GeopointSet>,
    pub select_ones: Vec<String>,
    /// `(xpath, escaped key)` pairs.
    pub encoded_fields: Vec<(String, String)>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            select_multiples: Vec::new(),
            geopoints: Vec::new(),
            select_ones: Vec::new(),
            encoded_fields: Vec::new(),
        }
    }

    pub fn column(&self, xpath: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.xpath == xpath)
    }
}

/// Derived geopoint xpaths: `group/gps` gives `group/_gps_latitude` and so on.
pub fn geopoint_component_xpaths(xpath: &str) -> [String; 4] {
    let (prefix, name) = match xpath.rfind('/') {
        Some(pos) => xpath.split_at(pos + 1),
        None => ("", xpath),
    };
    GEOPOINT_SUFFIXES.map(|suffix| format!("{prefix}_{name}_{suffix}"))
}

/// What a title is being formatted for.
#[derive(Debug, Clone, Copy)]
pub enum TitleSource<'a> {
    Field { name: &'a str },
    Choice { question: &'a str, choice: &'a str },
    GeopointComponent,
    Column,
}

/// Format a column title from its xpath.
///
/// With `remove_group_name`, a field uses its own name, a choice uses
/// `question/choice` and a geopoint component its last path segment. The
/// group delimiter then replaces `/`.
pub fn format_title(
    xpath: &str,
    source: TitleSource<'_>,
    delimiter: GroupDelimiter,
    remove_group_name: bool,
) -> String {
    let title = if remove_group_name {
        match source {
            TitleSource::Field { name } => name.to_string(),
            TitleSource::Choice { question, choice } => format!("{question}/{choice}"),
            TitleSource::GeopointComponent => {
                xpath.rsplit('/').next().unwrap_or(xpath).to_string()
            }
            TitleSource::Column => xpath.to_string(),
        }
    } else {
        xpath.to_string()
    };
    match delimiter {
        GroupDelimiter::Slash => title,
        other => title.replace('/', other.as_str()),
    }
}

/// The immutable result of indexing a form for one set of export options.
#[derive(Debug, Clone)]
pub struct IndexedSchema {
    form: FormSchema,
    labels: LabelResolver,
    sections: Vec<Section>,
    fields: BTreeMap<String, FieldNode>,
    extra_columns: Vec<String>,
}

impl IndexedSchema {
    pub fn form(&self) -> &FormSchema {
        &self.form
    }

    pub fn form_name(&self) -> &str {
        &self.form.name
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn root_section(&self) -> &Section {
        &self.sections[0]
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn field(&self, xpath: &str) -> Option<&FieldNode> {
        self.fields.get(xpath)
    }

    pub fn labels(&self) -> &LabelResolver {
        &self.labels
    }

    /// Columns written after the form's own columns in every section.
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Xpaths of photo, image, audio and video questions.
    pub fn media_xpaths(&self) -> BTreeSet<String> {
        self.fields
            .values()
            .filter(|field| field.question_type.is_media())
            .map(|field| field.xpath.clone())
            .collect()
    }

    /// Choices of a select question, read from the itemset table when the
    /// question draws its choices from a shared list.
    pub fn choices_for<'a>(&'a self, field: &'a FieldNode) -> &'a [Choice] {
        let from_itemset = || {
            field
                .itemset
                .as_ref()
                .and_then(|name| self.form.itemsets.get(name))
        };
        if field.uses_itemset()
            && let Some(choices) = from_itemset()
        {
            return choices;
        }
        if field.choices.is_empty() {
            return from_itemset().map(Vec::as_slice).unwrap_or_default();
        }
        &field.choices
    }

    /// Label of the choice `name` of select question `xpath`.
    pub fn choice_label(&self, xpath: &str, name: &str) -> Option<String> {
        let field = self.field(xpath)?;
        let choice = self.choices_for(field).iter().find(|c| c.name == name)?;
        self.labels.resolve(choice.label.as_ref())
    }

    /// Every select-multiple set across all sections.
    pub fn select_multiples(&self) -> impl Iterator<Item = &SelectMultipleSet> {
        self.sections.iter().flat_map(|section| &section.select_multiples)
    }

    /// Every geopoint set across all sections.
    pub fn geopoints(&self) -> impl Iterator<Item = &GeopointSet> {
        self.sections.iter().flat_map(|section| &section.geopoints)
    }
}

struct Indexer<'a> {
    form: &'a FormSchema,
    options: &'a ExportOptions,
    labels: LabelResolver,
    sections: Vec<Section>,
    fields: BTreeMap<String, FieldNode>,
}

impl Indexer<'_> {
    fn title(&self, xpath: &str, source: TitleSource<'_>) -> String {
        format_title(
            xpath,
            source,
            self.options.group_delimiter,
            self.options.truncates_group_titles(),
        )
    }

    fn walk(&mut self, nodes: &[SchemaNode], current: usize) -> Result<()> {
        for node in nodes {
            match node {
                SchemaNode::Group(group) => self.walk(&group.children, current)?,
                SchemaNode::Repeat(group) => {
                    if self.sections.iter().any(|s| s.name == group.xpath) {
                        return Err(ExportError::schema(format!(
                            "duplicate repeat xpath `{}`",
                            group.xpath
                        )));
                    }
                    self.sections.push(Section::new(group.xpath.clone()));
                    let index = self.sections.len() - 1;
                    self.walk(&group.children, index)?;
                }
                SchemaNode::Field(field) => self.add_field(field, current)?,
            }
        }
        Ok(())
    }

    fn add_field(&mut self, field: &FieldNode, current: usize) -> Result<()> {
        if field.name.is_empty() {
            return Err(ExportError::schema(format!(
                "field at `{}` has no name",
                field.xpath
            )));
        }
        if self.fields.contains_key(&field.xpath) {
            return Err(ExportError::schema(format!(
                "duplicate field xpath `{}`",
                field.xpath
            )));
        }
        self.fields.insert(field.xpath.clone(), field.clone());
        if field.question_type.is_excluded() {
            return Ok(());
        }

        let title = self.title(&field.xpath, TitleSource::Field { name: &field.name });
        let label = self
            .labels
            .resolve(field.label.as_ref())
            .unwrap_or_else(|| title.clone());
        let mut columns = vec![ColumnSpec {
            xpath: field.xpath.clone(),
            title,
            label,
            column_type: field.question_type.bind_type(),
            kind: ColumnKind::Question,
            hxl: field.hxl.clone(),
        }];

        if is_invalid_for_mongo(&field.xpath) {
            let encoded = encode_path(&field.xpath);
            self.sections[current]
                .encoded_fields
                .push((field.xpath.clone(), encoded));
        }

        match field.question_type {
            QuestionType::SelectMultiple => {
                let choices = if self.options.split_select_multiples {
                    self.choice_columns(field)
                } else {
                    Vec::new()
                };
                for choice in &choices {
                    let spec = ColumnSpec {
                        xpath: choice.xpath.clone(),
                        title: self.title(
                            &choice.xpath,
                            TitleSource::Choice {
                                question: &field.name,
                                choice: &choice.name,
                            },
                        ),
                        label: format!(
                            "{}{}{}",
                            field.name,
                            self.options.group_delimiter.as_str(),
                            choice.label
                        ),
                        column_type: BindType::String,
                        kind: ColumnKind::Choice {
                            question: field.xpath.clone(),
                            name: choice.name.clone(),
                        },
                        hxl: None,
                    };
                    if !columns.iter().any(|c| c.xpath == spec.xpath)
                        && self.sections[current].column(&spec.xpath).is_none()
                    {
                        columns.push(spec);
                    }
                }
                self.sections[current].select_multiples.push(SelectMultipleSet {
                    xpath: field.xpath.clone(),
                    choices,
                });
            }
            QuestionType::SelectOne => {
                self.sections[current].select_ones.push(field.xpath.clone());
            }
            QuestionType::Geopoint => {
                let components = geopoint_component_xpaths(&field.xpath);
                for xpath in &components {
                    let title = self.title(xpath, TitleSource::GeopointComponent);
                    columns.push(ColumnSpec {
                        xpath: xpath.clone(),
                        label: title.clone(),
                        title,
                        column_type: BindType::Decimal,
                        kind: ColumnKind::GeopointComponent {
                            parent: field.xpath.clone(),
                        },
                        hxl: None,
                    });
                }
                self.sections[current].geopoints.push(GeopointSet {
                    xpath: field.xpath.clone(),
                    components,
                });
            }
            _ => {}
        }

        self.sections[current].columns.extend(columns);
        Ok(())
    }

    fn choice_columns(&self, field: &FieldNode) -> Vec<ChoiceColumn> {
        let choices: Vec<Choice> = if field.uses_itemset() {
            let list = field.itemset.as_deref().unwrap_or_default();
            match self.form.itemsets.get(list) {
                Some(choices) => choices.clone(),
                None => {
                    warn!(field = %field.xpath, itemset = list, "itemset not found; using static choices");
                    field.choices.clone()
                }
            }
        } else {
            field.choices.clone()
        };

        choices
            .into_iter()
            .map(|choice| {
                let xpath = format!("{}/{}", field.xpath, choice.name);
                let label = self.labels.resolve(choice.label.as_ref()).unwrap_or_else(|| {
                    self.title(
                        &xpath,
                        TitleSource::Choice {
                            question: &field.name,
                            choice: &choice.name,
                        },
                    )
                });
                ChoiceColumn {
                    xpath,
                    name: choice.name,
                    label,
                }
            })
            .collect()
    }
}

/// Index `form` into output sections for `options`.
///
/// Indexing the same form with the same options always yields the same
/// sections and column order.
pub fn index(form: &FormSchema, options: &ExportOptions) -> Result<IndexedSchema> {
    if form.name.trim().is_empty() {
        return Err(ExportError::schema("form has no name"));
    }
    let mut indexer = Indexer {
        form,
        options,
        labels: LabelResolver::new(form, options.target_language.as_deref()),
        sections: vec![Section::new(form.name.clone())],
        fields: BTreeMap::new(),
    };
    indexer.walk(&form.children, 0)?;

    let mut extra_columns: Vec<String> = EXTRA_FIELDS.iter().map(|s| s.to_string()).collect();
    if options.include_reviews {
        extra_columns.extend(REVIEW_FIELDS.iter().map(|s| s.to_string()));
    }

    debug!(
        form = %form.name,
        sections = indexer.sections.len(),
        columns = indexer.sections.iter().map(|s| s.columns.len()).sum::<usize>(),
        "indexed form schema"
    );

    Ok(IndexedSchema {
        form: form.clone(),
        labels: indexer.labels,
        sections: indexer.sections,
        fields: indexer.fields,
        extra_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geopoint_components_keep_group_prefix() {
        assert_eq!(
            geopoint_component_xpaths("group/gps")[0],
            "group/_gps_latitude"
        );
        assert_eq!(geopoint_component_xpaths("gps")[3], "_gps_precision");
    }

    #[test]
    fn titles_follow_delimiter_and_group_policy() {
        let field = TitleSource::Field { name: "age" };
        assert_eq!(
            format_title("children/details/age", field, GroupDelimiter::Dot, false),
            "children.details.age"
        );
        assert_eq!(
            format_title("children/details/age", field, GroupDelimiter::Slash, true),
            "age"
        );
        let choice = TitleSource::Choice {
            question: "colors",
            choice: "red",
        };
        assert_eq!(
            format_title("group/colors/red", choice, GroupDelimiter::Dot, true),
            "colors.red"
        );
        assert_eq!(
            format_title(
                "group/_gps_latitude",
                TitleSource::GeopointComponent,
                GroupDelimiter::Slash,
                true
            ),
            "_gps_latitude"
        );
    }
}
