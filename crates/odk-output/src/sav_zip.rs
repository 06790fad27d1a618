//! One SPSS system file per section, zipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Seek, Write};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;
use zip::write::ZipWriter;

use odk_core::{ColumnKind, IndexedSchema, SelectMultiplePolicy, SheetColumn, SheetLayout, SheetNaming, SheetSink};
use odk_model::tags::{ID, INDEX, PARENT_INDEX, SUBMISSION_TIME};
use odk_model::{BindType, CellValue, ExportError, ExportOptions, FlatRow, QuestionType, Result};
use odk_sav::{
    FormatType, MAX_STRING_WIDTH, SavError, SavFormat, SavValue, SavVariable, SavWriter,
    SavWriterOptions, VariableNames, clash_suffix,
};

use crate::common::{append_entry, spool_file, unknown_sheet};

const FORMAT: &str = "sav";

fn sav_error(err: SavError) -> ExportError {
    ExportError::write(FORMAT, err)
}

/// How a sheet cell becomes a case value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Numeric,
    Date,
    DateTime,
    Text,
}

impl Conversion {
    fn value(self, cell: Option<&CellValue>) -> SavValue {
        match self {
            Conversion::Numeric => SavValue::Numeric(cell.and_then(CellValue::as_f64)),
            Conversion::Date | Conversion::DateTime => match cell {
                Some(CellValue::Date(date)) => SavValue::date(*date),
                Some(CellValue::DateTime(value)) => SavValue::datetime(*value),
                Some(CellValue::Text(text)) => parse_timestamp(text)
                    .map(SavValue::datetime)
                    .unwrap_or_else(SavValue::missing),
                _ => SavValue::missing(),
            },
            Conversion::Text => {
                SavValue::string(cell.map(CellValue::to_string).unwrap_or_default())
            }
        }
    }
}

/// Dates and ISO 8601 timestamps, with or without fractional seconds or offset.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(value) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(value.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
}

/// Choice names that can be stored as numbers without losing anything.
fn is_numeric_name(name: &str) -> bool {
    let digits = name.strip_prefix('-').unwrap_or(name);
    let zero_padded = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    !zero_padded && name.parse::<f64>().is_ok_and(f64::is_finite)
}

fn conversion_for(
    schema: &IndexedSchema,
    column: &SheetColumn,
    policy: SelectMultiplePolicy,
) -> Conversion {
    match &column.kind {
        None => match column.key.as_str() {
            ID | INDEX | PARENT_INDEX => Conversion::Numeric,
            SUBMISSION_TIME => Conversion::DateTime,
            _ => Conversion::Text,
        },
        Some(ColumnKind::Choice { name, .. }) => {
            if policy == SelectMultiplePolicy::Value && !is_numeric_name(name) {
                Conversion::Text
            } else {
                Conversion::Numeric
            }
        }
        Some(ColumnKind::GeopointComponent { .. }) => Conversion::Numeric,
        Some(ColumnKind::Question) => match column.column_type {
            BindType::Int | BindType::Decimal => Conversion::Numeric,
            BindType::Date => Conversion::Date,
            _ if numeric_select_one(schema, &column.key) => Conversion::Numeric,
            _ => Conversion::Text,
        },
    }
}

fn numeric_select_one(schema: &IndexedSchema, xpath: &str) -> bool {
    let Some(field) = schema.field(xpath) else {
        return false;
    };
    let choices = schema.choices_for(field);
    field.question_type == QuestionType::SelectOne
        && !choices.is_empty()
        && choices.iter().all(|choice| is_numeric_name(&choice.name))
}

/// Variables of one sheet, with the conversion of each column.
fn sheet_variables(
    schema: &IndexedSchema,
    layout: &SheetLayout,
    policy: SelectMultiplePolicy,
) -> Vec<(SavVariable, Conversion)> {
    let mut names = VariableNames::new();
    let mut assigned: HashMap<&str, String> = HashMap::new();
    let mut variables = Vec::with_capacity(layout.columns.len());

    for column in &layout.columns {
        // Geopoint components follow the suffix their parent was given.
        let title = match &column.kind {
            Some(ColumnKind::GeopointComponent { parent }) => assigned
                .get(parent.as_str())
                .and_then(|name| clash_suffix(name))
                .map(|id| format!("{}_{id}", column.title))
                .unwrap_or_else(|| column.title.clone()),
            _ => column.title.clone(),
        };
        let name = names.assign(&title);
        assigned.insert(column.key.as_str(), name.clone());

        let conversion = conversion_for(schema, column, policy);
        let mut variable = match conversion {
            Conversion::Text => SavVariable::string(name, MAX_STRING_WIDTH),
            Conversion::Numeric => SavVariable::numeric(name),
            Conversion::Date => SavVariable::numeric(name)
                .with_format(SavFormat::new(FormatType::EDate, 40, 0)),
            Conversion::DateTime => SavVariable::numeric(name)
                .with_format(SavFormat::new(FormatType::DateTime, 40, 0)),
        };
        if !column.label.is_empty() {
            variable = variable.with_label(column.label.clone());
        }
        if column.kind == Some(ColumnKind::Question)
            && let Some(field) = schema.field(&column.key)
            && field.question_type == QuestionType::SelectOne
        {
            for choice in schema.choices_for(field) {
                let value = match conversion {
                    Conversion::Numeric => SavValue::Numeric(choice.name.parse().ok()),
                    _ => SavValue::string(choice.name.clone()),
                };
                let label = schema
                    .labels()
                    .resolve(choice.label.as_ref())
                    .unwrap_or_else(|| choice.name.clone());
                variable = variable.with_value_label(value, label);
            }
        }
        variables.push((variable, conversion));
    }
    variables
}

struct SavSheet {
    layout: SheetLayout,
    conversions: Vec<Conversion>,
    writer: SavWriter<File>,
}

/// Writes a zip archive with one `{section}.sav` entry per section.
///
/// Each section's file is written case by case to a temporary file.
pub struct SavZipSink<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    output: Option<W>,
    policy: SelectMultiplePolicy,
    sheets: Vec<SavSheet>,
}

impl<W: Write + Seek> SavZipSink<W> {
    pub fn new(writer: W, options: &ExportOptions) -> Self {
        Self {
            zip: Some(ZipWriter::new(writer)),
            output: None,
            policy: SelectMultiplePolicy::from_options(options),
            sheets: Vec::new(),
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.output
    }
}

impl<W: Write + Seek> SheetSink for SavZipSink<W> {
    fn naming(&self) -> SheetNaming {
        SheetNaming::File
    }

    fn begin(&mut self, schema: &IndexedSchema, layouts: &[SheetLayout]) -> Result<()> {
        let options = SavWriterOptions {
            file_label: schema.form().title.clone(),
            ..SavWriterOptions::default()
        };
        for layout in layouts {
            let (variables, conversions): (Vec<_>, Vec<_>) =
                sheet_variables(schema, layout, self.policy).into_iter().unzip();
            let writer =
                SavWriter::new(spool_file(FORMAT)?, variables, &options).map_err(sav_error)?;
            self.sheets.push(SavSheet {
                layout: layout.clone(),
                conversions,
                writer,
            });
        }
        Ok(())
    }

    fn write_row(&mut self, sheet: usize, row: &FlatRow) -> Result<()> {
        let SavSheet {
            layout,
            conversions,
            writer,
        } = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| unknown_sheet(FORMAT, sheet))?;
        let values: Vec<SavValue> = layout
            .cells(row)
            .zip(conversions.iter())
            .map(|(cell, conversion)| conversion.value(cell))
            .collect();
        writer.write_case(&values).map_err(sav_error)
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut zip) = self.zip.take() else {
            return Ok(());
        };
        for SavSheet { layout, writer, .. } in std::mem::take(&mut self.sheets) {
            let cases = writer.cases();
            let mut file = writer.finish().map_err(sav_error)?;
            append_entry(&mut zip, &format!("{}.sav", layout.name), &mut file, FORMAT)?;
            debug!(sheet = %layout.name, cases, "added SAV entry");
        }
        self.output = Some(zip.finish().map_err(|err| ExportError::write(FORMAT, err))?);
        Ok(())
    }
}
