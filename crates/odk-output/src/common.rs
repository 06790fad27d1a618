//! Helpers shared by the output targets.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use odk_model::{CellValue, ExportError};

/// Text of a cell in CSV and workbook output; missing cells become `na_rep`.
pub fn cell_text(value: Option<&CellValue>, na_rep: &str) -> String {
    match value {
        Some(value) => value.to_string(),
        None => na_rep.to_string(),
    }
}

/// Deflated entries with zip64 enabled.
pub(crate) fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true)
}

/// Anonymous temporary file, removed when dropped.
pub(crate) fn spool_file(format: &'static str) -> Result<File, ExportError> {
    tempfile::tempfile().map_err(|err| ExportError::write(format, err))
}

/// Copy a spooled file into the archive as `name`.
pub(crate) fn append_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    file: &mut File,
    format: &'static str,
) -> Result<(), ExportError> {
    file.seek(SeekFrom::Start(0))?;
    zip.start_file(name, entry_options())
        .map_err(|err| ExportError::write(format, err))?;
    io::copy(file, zip)?;
    Ok(())
}

pub(crate) fn unknown_sheet(format: &'static str, sheet: usize) -> ExportError {
    ExportError::write(format, format!("no sheet at position {sheet}"))
}
