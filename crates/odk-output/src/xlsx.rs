//! XLSX workbook with one worksheet per section.

use std::io::{Seek, Write};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use odk_core::{IndexedSchema, SheetLayout, SheetNaming, SheetSink};
use odk_model::{CellValue, ExportError, ExportOptions, FlatRow, Result};

use crate::common::unknown_sheet;

const FORMAT: &str = "xlsx";

fn xlsx_error(err: XlsxError) -> ExportError {
    ExportError::write(FORMAT, err)
}

struct XlsxSheet {
    layout: SheetLayout,
    next_row: u32,
}

/// Builds the workbook in memory and saves it to `writer` on `finish`.
///
/// Numbers and booleans keep their cell types, dates get a date format and
/// missing cells hold the `na_rep` filler.
pub struct XlsxSink<W: Write + Seek + Send> {
    workbook: Workbook,
    writer: W,
    options: ExportOptions,
    sheets: Vec<XlsxSheet>,
    date_format: Format,
    datetime_format: Format,
}

impl<W: Write + Seek + Send> XlsxSink<W> {
    pub fn new(writer: W, options: &ExportOptions) -> Self {
        Self {
            workbook: Workbook::new(),
            writer,
            options: options.clone(),
            sheets: Vec::new(),
            date_format: Format::new().set_num_format("yyyy-mm-dd"),
            datetime_format: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| ExportError::write(FORMAT, format!("too many columns: {col}")))
}

fn write_header(worksheet: &mut Worksheet, row: u32, values: &[String]) -> Result<()> {
    for (col, value) in values.iter().enumerate() {
        worksheet
            .write_string(row, column_index(col)?, value)
            .map_err(xlsx_error)?;
    }
    Ok(())
}

impl<W: Write + Seek + Send> SheetSink for XlsxSink<W> {
    fn naming(&self) -> SheetNaming {
        SheetNaming::Worksheet
    }

    fn begin(&mut self, _schema: &IndexedSchema, layouts: &[SheetLayout]) -> Result<()> {
        for layout in layouts {
            let worksheet = self.workbook.add_worksheet();
            worksheet.set_name(&layout.name).map_err(xlsx_error)?;
            let mut next_row = 0u32;
            for header in layout.header_rows(&self.options) {
                write_header(worksheet, next_row, &header)?;
                next_row += 1;
            }
            self.sheets.push(XlsxSheet {
                layout: layout.clone(),
                next_row,
            });
        }
        Ok(())
    }

    fn write_row(&mut self, sheet: usize, row: &FlatRow) -> Result<()> {
        let XlsxSheet { layout, next_row } = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| unknown_sheet(FORMAT, sheet))?;
        let worksheet = self
            .workbook
            .worksheet_from_index(sheet)
            .map_err(xlsx_error)?;
        let line = *next_row;
        for (col, cell) in layout.cells(row).enumerate() {
            let col = column_index(col)?;
            let written = match cell {
                None => worksheet.write_string(line, col, &self.options.na_rep),
                Some(CellValue::Bool(value)) => worksheet.write_boolean(line, col, *value),
                Some(CellValue::Int(value)) => worksheet.write_number(line, col, *value as f64),
                Some(CellValue::Float(value)) => worksheet.write_number(line, col, *value),
                Some(CellValue::Date(date)) => {
                    worksheet.write_datetime_with_format(line, col, date, &self.date_format)
                }
                Some(CellValue::DateTime(value)) => {
                    worksheet.write_datetime_with_format(line, col, value, &self.datetime_format)
                }
                Some(other) => worksheet.write_string(line, col, other.to_string()),
            };
            written.map_err(xlsx_error)?;
        }
        *next_row += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.workbook
            .save_to_writer(&mut self.writer)
            .map_err(xlsx_error)
    }
}
