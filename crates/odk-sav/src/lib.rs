//! SPSS system file (`.sav`) writer.
//!
//! Writes uncompressed, little-endian system files with UTF-8 text:
//!
//! - numeric and string variables up to 255 bytes wide
//! - long (64-byte) variable names through the long-name extension record
//! - variable labels and value labels, including labels of long strings
//! - date and date-time formats with values counted from 1582-10-14
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use odk_sav::{SavValue, SavVariable, SavWriter, SavWriterOptions};
//!
//! let variables = vec![
//!     SavVariable::numeric("age").with_label("Age"),
//!     SavVariable::string("name", 255),
//! ];
//! let mut writer =
//!     SavWriter::create(Path::new("survey.sav"), variables, &SavWriterOptions::default())
//!         .unwrap();
//! writer
//!     .write_case(&[SavValue::numeric(35.0), SavValue::string("Abe")])
//!     .unwrap();
//! writer.finish().unwrap();
//! ```

mod error;
pub mod header;
pub mod names;
mod reader;
mod types;
mod writer;

pub use error::{Result, SavError};

pub use types::{
    FormatType, MAX_NAME_LEN, MAX_STRING_WIDTH, SYSMIS, SavFormat, SavValue, SavVariable,
    SavWriterOptions, ValueLabel, VarType, seconds_since_epoch,
};

pub use names::{VariableNames, clash_suffix, short_names};
pub use reader::{SavHeader, read_header, read_header_from_path};
pub use writer::SavWriter;
