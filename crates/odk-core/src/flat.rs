//! Single-sheet ("flat") export.
//!
//! Repeat instances are spread into indexed columns instead of child sheets:
//! the name of the second child is `children[2]/name` and a nested repeat
//! becomes `children[1]/cartoons[3]/name`. Repeat columns are only known
//! once the data has been seen, so rows are buffered until [`FlatTableBuilder::finish`].

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use odk_model::tags::{ATTACHMENTS, FLAT_EXTRA_FIELDS, GEOPOINT_SUFFIXES, NOTES, REVIEW_FIELDS};
use odk_model::{
    Attachment, CellValue, ExportOptions, FlatRow, FormSchema, QuestionType, RecordValue, Result,
    SchemaNode, SubmissionRecord,
};

use crate::attachments::{AttachmentResolver, HostAttachmentResolver};
use crate::indexer::{
    IndexedSchema, SelectMultipleSet, TitleSource, format_title, geopoint_component_xpaths, index,
};
use crate::mongo::decode_path;
use crate::transform::{
    SelectMultiplePolicy, label_select_answers, split_geopoints, split_select_multiples,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Column(String),
    Repeat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnGroup {
    /// Columns known from the form alone.
    Fixed { key: String, columns: Vec<String> },
    /// Indexed columns of a repeat, discovered from data.
    Repeat { key: String },
}

impl ColumnGroup {
    fn key(&self) -> &str {
        match self {
            ColumnGroup::Fixed { key, .. } | ColumnGroup::Repeat { key } => key,
        }
    }
}

/// Columns discovered for one repeat, in first-seen order.
#[derive(Debug, Clone, Default)]
struct Discovered {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl Discovered {
    fn add(&mut self, column: &str) {
        if self.seen.insert(column.to_string()) {
            self.order.push(column.to_string());
        }
    }
}

/// A finished flat table: header rows followed by data rows, all as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub header_rows: Vec<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Accumulates submissions into a [`FlatTable`].
pub struct FlatTableBuilder {
    schema: IndexedSchema,
    options: ExportOptions,
    groups: Vec<ColumnGroup>,
    templates: HashMap<String, Vec<Slot>>,
    extra_columns: Vec<String>,
    discovered: HashMap<String, Discovered>,
    media: BTreeSet<String>,
    resolver: HostAttachmentResolver,
    rows: Vec<HashMap<String, String>>,
}

impl FlatTableBuilder {
    pub fn new(form: &FormSchema, options: ExportOptions) -> Result<Self> {
        let schema = index(form, &options)?;
        let mut builder = Self {
            groups: Vec::new(),
            templates: HashMap::new(),
            extra_columns: FLAT_EXTRA_FIELDS.iter().map(|s| s.to_string()).collect(),
            discovered: HashMap::new(),
            media: if options.include_images {
                schema.media_xpaths()
            } else {
                BTreeSet::new()
            },
            resolver: HostAttachmentResolver::new(options.host.clone()),
            rows: Vec::new(),
            schema,
            options,
        };
        if builder.options.include_reviews {
            builder
                .extra_columns
                .extend(REVIEW_FIELDS.iter().map(|s| s.to_string()));
        }
        let children = builder.schema.form().children.clone();
        builder.register(&children, false);
        debug!(
            form = %builder.schema.form_name(),
            groups = builder.groups.len(),
            repeats = builder.templates.len(),
            "built flat column template"
        );
        Ok(builder)
    }

    pub fn submissions(&self) -> usize {
        self.rows.len()
    }

    /// Question columns, with select multiples and geopoints expanded.
    fn field_columns(&self, node: &SchemaNode) -> Vec<String> {
        let SchemaNode::Field(field) = node else {
            return Vec::new();
        };
        if field.question_type.is_excluded() {
            return Vec::new();
        }
        match field.question_type {
            QuestionType::SelectMultiple if self.options.split_select_multiples => self
                .schema
                .select_multiples()
                .find(|set| set.xpath == field.xpath)
                .map(|set| set.choices.iter().map(|c| c.xpath.clone()).collect())
                .unwrap_or_default(),
            QuestionType::Geopoint => std::iter::once(field.xpath.clone())
                .chain(geopoint_component_xpaths(&field.xpath))
                .collect(),
            _ => vec![field.xpath.clone()],
        }
    }

    fn template(&self, nodes: &[SchemaNode]) -> Vec<Slot> {
        let mut slots = Vec::new();
        for node in nodes {
            match node {
                SchemaNode::Group(group) => slots.extend(self.template(&group.children)),
                SchemaNode::Repeat(group) => slots.push(Slot::Repeat(group.xpath.clone())),
                SchemaNode::Field(_) => {
                    slots.extend(self.field_columns(node).into_iter().map(Slot::Column));
                }
            }
        }
        slots
    }

    fn register(&mut self, nodes: &[SchemaNode], in_repeat: bool) {
        for node in nodes {
            match node {
                SchemaNode::Group(group) => self.register(&group.children, in_repeat),
                SchemaNode::Repeat(group) => {
                    let template = self.template(&group.children);
                    self.templates.insert(group.xpath.clone(), template);
                    self.groups.push(ColumnGroup::Repeat {
                        key: group.xpath.clone(),
                    });
                    self.register(&group.children, true);
                }
                SchemaNode::Field(_) if !in_repeat => {
                    let columns = self.field_columns(node);
                    if !columns.is_empty() {
                        self.groups.push(ColumnGroup::Fixed {
                            key: node.xpath().to_string(),
                            columns,
                        });
                    }
                }
                SchemaNode::Field(_) => {}
            }
        }
    }

    /// Scalar answers of one nesting level, split and labelled.
    fn level_row(&self, record: &SubmissionRecord, attachments: &[Attachment]) -> FlatRow {
        let mut row = FlatRow::new();
        for (key, value) in record.iter() {
            let key = decode_path(key);
            let cell = match value {
                RecordValue::Scalar(scalar) => {
                    let resolved = self
                        .media
                        .contains(&key)
                        .then(|| scalar.as_text())
                        .flatten()
                        .and_then(|name| self.resolver.resolve(name, attachments));
                    resolved.map_or_else(|| CellValue::from(scalar), CellValue::Text)
                }
                RecordValue::List(items) => CellValue::Text(
                    items
                        .iter()
                        .map(|item| CellValue::from(item).to_display())
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
                RecordValue::Tags(tags) => CellValue::Text(tag_edit_string(tags)),
                RecordValue::Notes(_) => CellValue::Text(String::new()),
                RecordValue::Repeat(_) | RecordValue::Attachments(_) => continue,
            };
            row.insert(key, cell);
        }

        if self.options.split_select_multiples {
            let sets: Vec<_> = self.schema.select_multiples().cloned().collect();
            let policy = SelectMultiplePolicy::from_options(&self.options);
            let show_labels = self.options.show_choice_labels;
            let label = |set: &SelectMultipleSet, name: &str| {
                show_labels
                    .then(|| self.schema.choice_label(&set.xpath, name))
                    .flatten()
            };
            split_select_multiples(&mut row, &sets, policy, &label);
        }
        let geopoints: Vec<_> = self.schema.geopoints().cloned().collect();
        split_geopoints(&mut row, &geopoints);
        if self.options.show_choice_labels {
            let selects: Vec<String> = self
                .schema
                .sections()
                .iter()
                .flat_map(|section| {
                    let unsplit = section
                        .select_multiples
                        .iter()
                        .filter(|_| !self.options.split_select_multiples)
                        .map(|set| set.xpath.clone());
                    section.select_ones.iter().cloned().chain(unsplit)
                })
                .collect();
            label_select_answers(
                &mut row,
                selects.iter().map(String::as_str),
                &|xpath: &str, name: &str| self.schema.choice_label(xpath, name),
            );
        }
        row
    }

    /// Spread repeat `items` into indexed columns of `out`.
    fn reindex(
        &self,
        repeat: &str,
        base: &str,
        items: &[SubmissionRecord],
        attachments: &[Attachment],
        discovered: &mut HashMap<String, Discovered>,
        out: &mut HashMap<String, String>,
    ) {
        let Some(template) = self.templates.get(repeat) else {
            return;
        };
        let prefix = format!("{repeat}/");
        let tags = &self.options.index_tags;
        for (position, item) in items.iter().enumerate() {
            let indexed = format!("{base}{}{}{}", tags.open, position + 1, tags.close);
            let row = self.level_row(item, attachments);
            for slot in template {
                match slot {
                    Slot::Column(xpath) => {
                        let rest = xpath.strip_prefix(&prefix).unwrap_or(xpath);
                        let column = format!("{indexed}/{rest}");
                        discovered.entry(repeat.to_string()).or_default().add(&column);
                        if let Some(value) = row.get(xpath).filter(|value| !value.is_null()) {
                            out.insert(column, value.to_display());
                        }
                    }
                    Slot::Repeat(nested) => {
                        let Some(RecordValue::Repeat(children)) = item
                            .iter()
                            .find(|(key, _)| decode_path(key) == *nested)
                            .map(|(_, value)| value)
                        else {
                            continue;
                        };
                        let rest = nested.strip_prefix(&prefix).unwrap_or(nested);
                        let nested_base = format!("{indexed}/{rest}");
                        self.reindex(nested, &nested_base, children, attachments, discovered, out);
                    }
                }
            }
        }
    }

    /// Add one submission.
    pub fn push(&mut self, record: &SubmissionRecord) {
        let attachments = record.attachments();
        let mut out: HashMap<String, String> = self
            .level_row(record, attachments)
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key, value.to_display()))
            .collect();

        let mut discovered = std::mem::take(&mut self.discovered);
        for (key, value) in record.iter() {
            let RecordValue::Repeat(items) = value else {
                continue;
            };
            let key = decode_path(key);
            if key == ATTACHMENTS || key == NOTES {
                continue;
            }
            self.reindex(&key, &key, items, attachments, &mut discovered, &mut out);
        }
        self.discovered = discovered;
        self.rows.push(out);
    }

    fn columns(&self) -> Vec<String> {
        let filter = self.options.columns.as_ref();
        let mut columns: Vec<String> = self
            .groups
            .iter()
            .filter(|group| {
                filter.is_none_or(|list| list.iter().any(|c| group.key().starts_with(c.as_str())))
            })
            .flat_map(|group| match group {
                ColumnGroup::Fixed { columns, .. } => columns.clone(),
                ColumnGroup::Repeat { key } => self
                    .discovered
                    .get(key)
                    .map(|found| found.order.clone())
                    .unwrap_or_default(),
            })
            .collect();
        let mut seen: HashSet<String> = HashSet::new();
        columns.retain(|column| seen.insert(column.clone()));
        columns.extend(
            self.extra_columns
                .iter()
                .filter(|extra| filter.is_none_or(|list| list.contains(*extra)))
                .cloned(),
        );
        columns
    }

    /// Choice column xpath to `(question name, choice name)`.
    fn choice_columns(&self) -> HashMap<&str, (&str, &str)> {
        self.schema
            .select_multiples()
            .filter_map(|set| {
                let question = self.schema.field(&set.xpath)?;
                Some(set.choices.iter().map(move |choice| {
                    (choice.xpath.as_str(), (question.name.as_str(), choice.name.as_str()))
                }))
            })
            .flatten()
            .collect()
    }

    fn title(&self, column: &str, choices: &HashMap<&str, (&str, &str)>) -> String {
        let source = if let Some(&(question, choice)) = choices.get(column) {
            TitleSource::Choice { question, choice }
        } else if let Some(field) = self.schema.field(column) {
            TitleSource::Field { name: &field.name }
        } else if GEOPOINT_SUFFIXES
            .iter()
            .any(|suffix| column.ends_with(&format!("_{suffix}")))
        {
            TitleSource::GeopointComponent
        } else {
            TitleSource::Column
        };
        format_title(
            column,
            source,
            self.options.group_delimiter,
            self.options.truncates_group_titles(),
        )
    }

    fn label(&self, column: &str, choices: &HashMap<&str, (&str, &str)>) -> String {
        let labels = self.schema.labels();
        if let Some(&(question, choice)) = choices.get(column) {
            let question_xpath = column.rsplit_once('/').map_or(column, |(parent, _)| parent);
            let label = self
                .schema
                .choice_label(question_xpath, choice)
                .unwrap_or_else(|| choice.to_string());
            return format!("{question}{}{label}", self.options.group_delimiter.as_str());
        }
        match self.schema.field(column) {
            Some(field) => labels
                .resolve(field.label.as_ref())
                .unwrap_or_else(|| field.name.clone()),
            None => column.to_string(),
        }
    }

    /// Resolve columns and render every buffered row.
    pub fn finish(self) -> FlatTable {
        let columns = self.columns();
        let choices = self.choice_columns();

        let mut header_rows = Vec::new();
        if self.options.writes_title_row() {
            header_rows.push(columns.iter().map(|c| self.title(c, &choices)).collect());
        }
        if self.options.writes_label_row() {
            header_rows.push(columns.iter().map(|c| self.label(c, &choices)).collect());
        }
        if self.options.include_hxl {
            let tags: Vec<String> = columns
                .iter()
                .map(|c| {
                    self.schema
                        .field(c)
                        .and_then(|field| field.hxl.clone())
                        .unwrap_or_default()
                })
                .collect();
            if tags.iter().any(|tag| !tag.is_empty()) {
                header_rows.push(tags);
            }
        }

        let na_rep = &self.options.na_rep;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column).unwrap_or(na_rep).clone())
                    .collect()
            })
            .collect();

        debug!(columns = columns.len(), rows = self.rows.len(), "rendered flat table");
        FlatTable {
            columns,
            header_rows,
            rows,
        }
    }
}

/// Sorted tags joined by `, `; tags holding both a comma and a space are quoted.
fn tag_edit_string(tags: &[String]) -> String {
    let mut quoted: Vec<String> = tags
        .iter()
        .map(|tag| {
            if tag.contains(',') && tag.contains(' ') {
                format!("\"{tag}\"")
            } else {
                tag.clone()
            }
        })
        .collect();
    quoted.sort();
    quoted.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_sorted_and_quoted() {
        let tags = vec!["zeta".to_string(), "a, b".to_string(), "alpha".to_string()];
        assert_eq!(tag_edit_string(&tags), "\"a, b\", alpha, zeta");
        assert_eq!(tag_edit_string(&[]), "");
    }
}
