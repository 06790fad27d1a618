use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use odk_cli::logging::{LogConfig, LogFormat, init_logging_with_writer};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn json_logs_carry_export_events() {
    let captured = Captured::default();
    let config = LogConfig {
        level_filter: LevelFilter::INFO,
        use_env_filter: false,
        format: LogFormat::Json,
        with_ansi: false,
        ..LogConfig::default()
    };
    init_logging_with_writer(&config, captured.clone());

    tracing::info!(target: "odk_core::builder", submissions = 3, "export finished");
    tracing::debug!(target: "odk_core::builder", "hidden at info level");
    tracing::info!(target: "other_crate", "filtered out");

    let output = String::from_utf8(captured.0.lock().expect("lock").clone()).expect("utf8");
    assert!(output.contains("export finished"));
    assert!(output.contains("\"submissions\":3"));
    assert!(!output.contains("hidden at info level"));
    assert!(!output.contains("filtered out"));
}
