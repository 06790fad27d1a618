//! Per-sheet column layout shared by every output target.

use odk_model::{BindType, CellValue, ExportOptions, FlatRow};

use crate::indexer::{ColumnKind, IndexedSchema, Section};
use crate::naming::SheetNaming;

/// One output column of a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetColumn {
    /// Row key: the column xpath or an extra column name.
    pub key: String,
    pub title: String,
    pub label: String,
    pub hxl: Option<String>,
    pub column_type: BindType,
    /// `None` for extra columns such as `_id`.
    pub kind: Option<ColumnKind>,
}

impl SheetColumn {
    fn extra(name: &str) -> Self {
        Self {
            key: name.to_string(),
            title: name.to_string(),
            label: name.to_string(),
            hxl: None,
            column_type: BindType::String,
            kind: None,
        }
    }

    pub fn is_extra(&self) -> bool {
        self.kind.is_none()
    }
}

/// Columns and emitted name of one section's sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// Section name (form name or repeat xpath).
    pub section: String,
    /// Name the sheet is emitted under.
    pub name: String,
    pub columns: Vec<SheetColumn>,
}

impl SheetLayout {
    /// Layouts for every section of `schema`, in section order.
    pub fn for_schema(
        schema: &IndexedSchema,
        options: &ExportOptions,
        naming: SheetNaming,
    ) -> Vec<SheetLayout> {
        let names = naming.assign(schema.sections().iter().map(|s| s.name.as_str()));
        schema
            .sections()
            .iter()
            .zip(names)
            .map(|(section, name)| Self::for_section(schema, section, name, options))
            .collect()
    }

    fn for_section(
        schema: &IndexedSchema,
        section: &Section,
        name: String,
        options: &ExportOptions,
    ) -> SheetLayout {
        let wanted = |key: &str, title: &str| {
            options
                .columns
                .as_ref()
                .is_none_or(|list| list.iter().any(|c| c == key || c == title))
        };
        let form_columns = section.columns.iter().map(|spec| SheetColumn {
            key: spec.xpath.clone(),
            title: spec.title.clone(),
            label: spec.label.clone(),
            hxl: spec.hxl.clone(),
            column_type: spec.column_type,
            kind: Some(spec.kind.clone()),
        });
        let extra_columns = schema
            .extra_columns()
            .iter()
            .map(|name| SheetColumn::extra(name));
        let columns = form_columns
            .chain(extra_columns)
            .filter(|column| wanted(&column.key, &column.title))
            .collect();
        SheetLayout {
            section: section.name.clone(),
            name,
            columns,
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.title.clone()).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    /// HXL tags, or `None` when no column of the sheet carries one.
    pub fn hxl_tags(&self) -> Option<Vec<String>> {
        self.columns
            .iter()
            .any(|c| c.hxl.is_some())
            .then(|| {
                self.columns
                    .iter()
                    .map(|c| c.hxl.clone().unwrap_or_default())
                    .collect()
            })
    }

    /// Header rows in output order: titles, labels, HXL tags.
    pub fn header_rows(&self, options: &ExportOptions) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        if options.writes_title_row() {
            rows.push(self.titles());
        }
        if options.writes_label_row() {
            rows.push(self.labels());
        }
        if options.include_hxl {
            rows.extend(self.hxl_tags());
        }
        rows
    }

    /// Cells of `row` in column order; `None` for missing or null values.
    pub fn cells<'r>(&'r self, row: &'r FlatRow) -> impl Iterator<Item = Option<&'r CellValue>> + 'r {
        self.columns
            .iter()
            .map(move |column| row.get(&column.key).filter(|value| !value.is_null()))
    }
}

#[cfg(test)]
mod tests {
    use odk_model::{FieldNode, FormSchema, QuestionType, SchemaNode};

    use super::*;
    use crate::indexer::index;

    fn form() -> FormSchema {
        FormSchema::new(
            "data",
            vec![
                SchemaNode::Field(FieldNode::new("name", "name", QuestionType::Text).with_hxl("#name")),
                SchemaNode::Field(FieldNode::new("age", "age", QuestionType::Integer)),
            ],
        )
    }

    #[test]
    fn extra_columns_follow_form_columns() {
        let options = ExportOptions::default();
        let schema = index(&form(), &options).expect("index");
        let layouts = SheetLayout::for_schema(&schema, &options, SheetNaming::File);
        let titles = layouts[0].titles();
        assert_eq!(&titles[..3], ["name", "age", "_id"]);
        assert_eq!(titles.last().map(String::as_str), Some("_submitted_by"));
        assert_eq!(layouts[0].header_rows(&options).len(), 1);
    }

    #[test]
    fn header_rows_follow_label_and_hxl_options() {
        let options = ExportOptions::default().with_labels(true).with_hxl(true);
        let schema = index(&form(), &options).expect("index");
        let layout = &SheetLayout::for_schema(&schema, &options, SheetNaming::File)[0];
        let rows = layout.header_rows(&options);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][0], "#name");
        assert_eq!(rows[2][1], "");

        let labels_only = ExportOptions::default().with_labels_only(true);
        assert_eq!(layout.header_rows(&labels_only), vec![layout.labels()]);
    }

    #[test]
    fn column_filter_keeps_named_columns() {
        let mut options = ExportOptions::default();
        options.columns = Some(vec!["age".to_string(), "_id".to_string()]);
        let schema = index(&form(), &options).expect("index");
        let layout = &SheetLayout::for_schema(&schema, &options, SheetNaming::File)[0];
        assert_eq!(layout.titles(), vec!["age", "_id"]);
    }
}
