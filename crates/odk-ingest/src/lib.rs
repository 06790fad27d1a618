pub mod config;
pub mod error;
pub mod form;
pub mod records;

pub use config::load_export_options;
pub use error::{IngestError, Result};
pub use form::{load_form_schema, parse_form_schema};
pub use records::{RecordCursor, record_from_json};
