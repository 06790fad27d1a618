//! Export target formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use odk_core::SheetNaming;
use odk_model::ExportOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Zip of one CSV per section.
    CsvZip,
    /// Workbook with one worksheet per section.
    Xlsx,
    /// Zip of one SPSS system file per section.
    SavZip,
    /// One wide CSV with repeats spread into indexed columns.
    FlatCsv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [Self::CsvZip, Self::Xlsx, Self::SavZip, Self::FlatCsv];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CsvZip => "csv-zip",
            Self::Xlsx => "xlsx",
            Self::SavZip => "sav-zip",
            Self::FlatCsv => "flat-csv",
        }
    }

    /// File extension of the export file.
    pub fn extension(self) -> &'static str {
        match self {
            Self::CsvZip | Self::SavZip => "zip",
            Self::Xlsx => "xlsx",
            Self::FlatCsv => "csv",
        }
    }

    /// How sections are named inside the export, `None` for the flat CSV.
    pub fn naming(self) -> Option<SheetNaming> {
        match self {
            Self::CsvZip | Self::SavZip => Some(SheetNaming::File),
            Self::Xlsx => Some(SheetNaming::Worksheet),
            Self::FlatCsv => None,
        }
    }

    /// The options an export in this format runs with.
    ///
    /// SAV variable names are built from element names, so SAV exports always
    /// truncate group titles.
    pub fn effective_options(self, options: &ExportOptions) -> ExportOptions {
        let mut options = options.clone();
        if self == Self::SavZip {
            options.truncate_group_title = true;
        }
        options
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| format!("unknown export format: {s}"))
    }
}
