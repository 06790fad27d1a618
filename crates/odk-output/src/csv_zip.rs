//! One CSV per section, zipped.
//!
//! Rows of different sections arrive interleaved, so each section is spooled
//! to its own temporary file and the archive is assembled in `finish`.

use std::fs::File;
use std::io::{Seek, Write};

use tracing::debug;
use zip::write::ZipWriter;

use odk_core::{IndexedSchema, SheetLayout, SheetNaming, SheetSink};
use odk_model::{ExportError, ExportOptions, FlatRow, Result};

use crate::common::{append_entry, cell_text, spool_file, unknown_sheet};

const FORMAT: &str = "csv";

struct CsvSheet {
    layout: SheetLayout,
    writer: csv::Writer<File>,
}

/// Writes a zip archive with one `{section}.csv` entry per section.
pub struct CsvZipSink<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    output: Option<W>,
    options: ExportOptions,
    sheets: Vec<CsvSheet>,
}

impl<W: Write + Seek> CsvZipSink<W> {
    pub fn new(writer: W, options: &ExportOptions) -> Self {
        Self {
            zip: Some(ZipWriter::new(writer)),
            output: None,
            options: options.clone(),
            sheets: Vec::new(),
        }
    }

    /// The finished archive, once `finish` has run.
    pub fn into_inner(self) -> Option<W> {
        self.output
    }
}

fn csv_error(err: csv::Error) -> ExportError {
    ExportError::write(FORMAT, err)
}

impl<W: Write + Seek> SheetSink for CsvZipSink<W> {
    fn naming(&self) -> SheetNaming {
        SheetNaming::File
    }

    fn begin(&mut self, _schema: &IndexedSchema, layouts: &[SheetLayout]) -> Result<()> {
        for layout in layouts {
            let mut writer = csv::Writer::from_writer(spool_file(FORMAT)?);
            for header in layout.header_rows(&self.options) {
                writer.write_record(&header).map_err(csv_error)?;
            }
            self.sheets.push(CsvSheet {
                layout: layout.clone(),
                writer,
            });
        }
        Ok(())
    }

    fn write_row(&mut self, sheet: usize, row: &FlatRow) -> Result<()> {
        let CsvSheet { layout, writer } = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| unknown_sheet(FORMAT, sheet))?;
        let na_rep = self.options.na_rep.as_str();
        writer
            .write_record(layout.cells(row).map(|cell| cell_text(cell, na_rep)))
            .map_err(csv_error)
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut zip) = self.zip.take() else {
            return Ok(());
        };
        for CsvSheet { layout, writer } in std::mem::take(&mut self.sheets) {
            let mut file = writer
                .into_inner()
                .map_err(|err| ExportError::write(FORMAT, err.into_error()))?;
            append_entry(&mut zip, &format!("{}.csv", layout.name), &mut file, FORMAT)?;
            debug!(sheet = %layout.name, "added CSV entry");
        }
        self.output = Some(zip.finish().map_err(|err| ExportError::write(FORMAT, err))?);
        Ok(())
    }
}
