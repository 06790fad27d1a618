use std::path::PathBuf;

use odk_core::ExportResult;
use odk_output::ExportFormat;

/// Outcome of the `export` command.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub destination: PathBuf,
    pub format: ExportFormat,
    pub result: ExportResult,
    /// Advisory raised when the data file held no submissions.
    pub warning: Option<String>,
}
