pub mod cell;
pub mod error;
pub mod options;
pub mod record;
pub mod schema;
pub mod tags;

pub use cell::{CellValue, FlatRow};
pub use error::{ExportError, Result};
pub use options::{ExportOptions, GroupDelimiter, IndexTags};
pub use record::{Attachment, RecordValue, Scalar, SubmissionRecord};
pub use schema::{BindType, Choice, FieldNode, FormSchema, GroupNode, Label, QuestionType, SchemaNode};
