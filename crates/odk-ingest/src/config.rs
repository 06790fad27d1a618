use std::path::Path;

use tracing::debug;

use odk_model::ExportOptions;

use crate::error::{IngestError, Result};

/// Load export policies from a TOML file. Missing keys keep their defaults.
pub fn load_export_options(path: &Path) -> Result<ExportOptions> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let options: ExportOptions = toml::from_str(&text).map_err(|source| IngestError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded export options");
    Ok(options)
}
