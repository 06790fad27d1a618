//! CLI library components for the submission exporter.

pub mod logging;
