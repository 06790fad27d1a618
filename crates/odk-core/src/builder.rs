//! Export driver.
//!
//! [`ExportBuilder`] indexes the form once, then drains a record cursor:
//! every submission is flattened into per-section rows, each row is
//! normalized by the [`RowTransformer`] and handed to a [`SheetSink`].

use std::collections::HashMap;
use std::error::Error;

use tracing::{debug, info, info_span};

use odk_model::tags::PARENT_TABLE_NAME;
use odk_model::{CellValue, ExportError, ExportOptions, FlatRow, FormSchema, Result, SubmissionRecord};

use crate::attachments::HostAttachmentResolver;
use crate::flatten::{FlattenContext, Flattened, RepeatIndices, flatten};
use crate::indexer::{IndexedSchema, index};
use crate::naming::SheetNaming;
use crate::sheet::SheetLayout;
use crate::transform::RowTransformer;

/// Destination of transformed rows.
pub trait SheetSink {
    /// How this sink names its sheets.
    fn naming(&self) -> SheetNaming;

    /// Called once before any row, with one layout per section.
    fn begin(&mut self, schema: &IndexedSchema, layouts: &[SheetLayout]) -> Result<()>;

    /// Write one row to the sheet at `sheet` in the layouts given to `begin`.
    fn write_row(&mut self, sheet: usize, row: &FlatRow) -> Result<()>;

    /// Flush and close every sheet.
    fn finish(&mut self) -> Result<()>;
}

/// Progress callbacks; all default to no-ops.
pub trait ExportProgress {
    fn start(&self, _total: Option<usize>) {}
    fn submission(&self, _processed: usize) {}
    fn finish(&self, _processed: usize) {}
}

impl ExportProgress for () {}

/// Outcome of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub form: String,
    pub submissions: usize,
    /// `(section name, emitted sheet name, rows written)` in section order.
    pub sections: Vec<(String, String, usize)>,
}

impl ExportResult {
    pub fn total_rows(&self) -> usize {
        self.sections.iter().map(|(_, _, rows)| rows).sum()
    }

    /// `NoRecordsFound` when the cursor yielded nothing.
    pub fn check_records(&self) -> Result<()> {
        if self.submissions == 0 {
            return Err(ExportError::NoRecordsFound {
                form: self.form.clone(),
            });
        }
        Ok(())
    }
}

/// Drives one export of one form.
#[derive(Debug, Clone)]
pub struct ExportBuilder {
    schema: IndexedSchema,
    options: ExportOptions,
}

impl ExportBuilder {
    pub fn new(form: &FormSchema, options: ExportOptions) -> Result<Self> {
        let schema = index(form, &options)?;
        Ok(Self { schema, options })
    }

    pub fn schema(&self) -> &IndexedSchema {
        &self.schema
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn layouts(&self, naming: SheetNaming) -> Vec<SheetLayout> {
        SheetLayout::for_schema(&self.schema, &self.options, naming)
    }

    /// Export every record of `records` into `sink`.
    ///
    /// A cursor error aborts the export. Rows for sections the form does not
    /// declare are skipped.
    pub fn export<I, E, S, P>(&self, records: I, sink: &mut S, progress: &P) -> Result<ExportResult>
    where
        I: IntoIterator<Item = std::result::Result<SubmissionRecord, E>>,
        E: Into<Box<dyn Error + Send + Sync>>,
        S: SheetSink + ?Sized,
        P: ExportProgress + ?Sized,
    {
        let form = self.schema.form_name().to_string();
        let span = info_span!("export", form = %form);
        let _guard = span.enter();

        let layouts = self.layouts(sink.naming());
        let positions: HashMap<&str, usize> = layouts
            .iter()
            .enumerate()
            .map(|(position, layout)| (layout.section.as_str(), position))
            .collect();
        let emitted: HashMap<&str, &str> = layouts
            .iter()
            .map(|layout| (layout.section.as_str(), layout.name.as_str()))
            .collect();
        sink.begin(&self.schema, &layouts)?;

        let media = self.schema.media_xpaths();
        let resolver = HostAttachmentResolver::new(self.options.host.clone());
        let ctx = if self.options.include_images {
            FlattenContext::with_media(&media, &resolver)
        } else {
            FlattenContext::default()
        };
        let transformer = RowTransformer::new(&self.schema, &self.options);
        let mut indices = RepeatIndices::new();
        let mut counts = vec![0usize; layouts.len()];

        let records = records.into_iter();
        progress.start(records.size_hint().1);
        let mut submissions = 0usize;
        for record in records {
            let record = record.map_err(|err| ExportError::Cursor(err.into()))?;
            submissions += 1;
            let running_index = i64::try_from(submissions).unwrap_or(i64::MAX);
            let Flattened { own, repeats } =
                flatten(&record, running_index, &mut indices, &form, &ctx);

            let sections = std::iter::once((form.clone(), vec![own])).chain(repeats);
            for (section_name, rows) in sections {
                let (Some(&position), Some(section)) = (
                    positions.get(section_name.as_str()),
                    self.schema.section(&section_name),
                ) else {
                    debug!(section = %section_name, "skipping rows for undeclared section");
                    continue;
                };
                for row in rows {
                    let mut row = transformer.transform(row, section);
                    resolve_parent_table(&mut row, &emitted);
                    sink.write_row(position, &row)?;
                    counts[position] += 1;
                }
            }
            progress.submission(submissions);
        }

        sink.finish()?;
        progress.finish(submissions);
        info!(submissions, "export finished");

        Ok(ExportResult {
            form,
            submissions,
            sections: layouts
                .into_iter()
                .zip(counts)
                .map(|(layout, rows)| (layout.section, layout.name, rows))
                .collect(),
        })
    }
}

/// Rewrite `_parent_table_name` from a section name to its emitted sheet name.
fn resolve_parent_table(row: &mut FlatRow, emitted: &HashMap<&str, &str>) {
    if let Some(CellValue::Text(parent)) = row.get_mut(PARENT_TABLE_NAME)
        && let Some(name) = emitted.get(parent.as_str())
    {
        *parent = (*name).to_string();
    }
}
