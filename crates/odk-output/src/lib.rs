//! Export targets for form submissions.
//!
//! - **CSV-zip**: one CSV per section in a zip archive
//! - **XLSX**: one worksheet per section
//! - **SAV-zip**: one SPSS system file per section in a zip archive
//! - **Flat CSV**: one wide CSV with repeat instances spread into columns
//!
//! [`build_export`] picks the target by [`ExportFormat`]; the sinks can also
//! be driven directly through [`odk_core::ExportBuilder`].

mod common;
mod csv_zip;
mod export;
mod flat_csv;
mod format;
mod sav_zip;
mod xlsx;

pub use common::cell_text;
pub use csv_zip::CsvZipSink;
pub use export::build_export;
pub use flat_csv::write_flat_csv;
pub use format::ExportFormat;
pub use sav_zip::SavZipSink;
pub use xlsx::XlsxSink;
