use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// The form schema cannot be indexed (duplicate xpaths, unnamed elements).
    #[error("schema inconsistency: {0}")]
    SchemaInconsistency(String),
    /// The record cursor yielded no submissions. Advisory only.
    #[error("no records found for form `{form}`")]
    NoRecordsFound { form: String },
    /// The upstream record cursor failed while reading a submission.
    #[error("record cursor failed: {0}")]
    Cursor(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A sheet sink failed to serialize or write output.
    #[error("{format} writer failed: {source}")]
    Write {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

impl ExportError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaInconsistency(message.into())
    }

    pub fn write(
        format: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Write {
            format,
            source: source.into(),
        }
    }

    /// Whether the error should abort an export job.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoRecordsFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
