//! Export engine: schema indexing, row transformation, repeat flattening and
//! the driver that feeds transformed rows to sheet sinks.

pub mod attachments;
pub mod builder;
pub mod coerce;
pub mod flat;
pub mod flatten;
pub mod indexer;
pub mod labels;
pub mod mongo;
pub mod naming;
pub mod sheet;
pub mod transform;

pub use attachments::{AttachmentResolver, HostAttachmentResolver};
pub use builder::{ExportBuilder, ExportProgress, ExportResult, SheetSink};
pub use flat::{FlatTable, FlatTableBuilder};
pub use flatten::{FlattenContext, Flattened, RepeatIndices, flatten};
pub use indexer::{
    ChoiceColumn, ColumnKind, ColumnSpec, GeopointSet, IndexedSchema, Section, SelectMultipleSet,
    index,
};
pub use labels::LabelResolver;
pub use naming::{SheetNaming, valid_sheet_name};
pub use sheet::{SheetColumn, SheetLayout};
pub use transform::{RowTransformer, SelectMultiplePolicy};
