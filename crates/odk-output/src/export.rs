//! Export entry point: records in, one export file out.

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{info, info_span};

use odk_core::{ExportBuilder, ExportProgress, ExportResult, FlatTableBuilder};
use odk_model::{ExportOptions, FormSchema, SubmissionRecord};

use crate::csv_zip::CsvZipSink;
use crate::flat_csv::write_flat_csv;
use crate::format::ExportFormat;
use crate::sav_zip::SavZipSink;
use crate::xlsx::XlsxSink;

/// Export `records` of `form` to `destination` in `format`.
///
/// The destination file is created (or truncated) up front. SAV exports
/// always truncate group titles. An export with
/// no records still writes header-only sheets; call
/// [`ExportResult::check_records`] to surface that case.
pub fn build_export<I, E>(
    form: &FormSchema,
    options: &ExportOptions,
    records: I,
    destination: &Path,
    format: ExportFormat,
    progress: &dyn ExportProgress,
) -> Result<ExportResult>
where
    I: IntoIterator<Item = std::result::Result<SubmissionRecord, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    let span = info_span!("build_export", form = %form.name, format = %format);
    let _guard = span.enter();
    let options = &format.effective_options(options);

    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;

    let result = match format {
        ExportFormat::FlatCsv => {
            return export_flat_csv(form, options, records, file, destination, progress);
        }
        ExportFormat::CsvZip => {
            let builder = ExportBuilder::new(form, options.clone())?;
            let mut sink = CsvZipSink::new(BufWriter::new(file), options);
            let result = builder.export(records, &mut sink, progress)?;
            flush(sink.into_inner())?;
            result
        }
        ExportFormat::SavZip => {
            let builder = ExportBuilder::new(form, options.clone())?;
            let mut sink = SavZipSink::new(BufWriter::new(file), options);
            let result = builder.export(records, &mut sink, progress)?;
            flush(sink.into_inner())?;
            result
        }
        ExportFormat::Xlsx => {
            let builder = ExportBuilder::new(form, options.clone())?;
            let mut sink = XlsxSink::new(file, options);
            builder.export(records, &mut sink, progress)?
        }
    };
    info!(
        path = %destination.display(),
        submissions = result.submissions,
        rows = result.total_rows(),
        "export written"
    );
    Ok(result)
}

fn flush(output: Option<BufWriter<File>>) -> Result<()> {
    if let Some(mut output) = output {
        output.flush().context("failed to flush export file")?;
    }
    Ok(())
}

fn export_flat_csv<I, E>(
    form: &FormSchema,
    options: &ExportOptions,
    records: I,
    file: File,
    destination: &Path,
    progress: &dyn ExportProgress,
) -> Result<ExportResult>
where
    I: IntoIterator<Item = std::result::Result<SubmissionRecord, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    let mut builder = FlatTableBuilder::new(form, options.clone())?;
    let records = records.into_iter();
    progress.start(records.size_hint().1);
    for record in records {
        let record = record
            .map_err(|err| {
                let err: Box<dyn Error + Send + Sync> = err.into();
                anyhow!(err)
            })
            .context("failed to read submission")?;
        builder.push(&record);
        progress.submission(builder.submissions());
    }
    let submissions = builder.submissions();
    progress.finish(submissions);

    let table = builder.finish();
    let rows = table.rows.len();
    write_flat_csv(BufWriter::new(file), &table)?
        .flush()
        .context("failed to flush export file")?;

    let stem = destination
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| form.name.clone());
    info!(path = %destination.display(), submissions, "flat CSV written");
    Ok(ExportResult {
        form: form.name.clone(),
        submissions,
        sections: vec![(form.name.clone(), stem, rows)],
    })
}
