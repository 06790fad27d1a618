//! Progress bar over submissions.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use odk_core::ExportProgress;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} submissions";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {pos} submissions";

pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl ExportProgress for CliProgress {
    fn start(&self, total: Option<usize>) {
        match total {
            Some(total) => {
                self.bar.set_style(style(BAR_TEMPLATE));
                self.bar.set_length(total as u64);
            }
            None => {
                self.bar.set_style(style(SPINNER_TEMPLATE));
                self.bar.enable_steady_tick(Duration::from_millis(120));
            }
        }
    }

    fn submission(&self, processed: usize) {
        self.bar.set_position(processed as u64);
    }

    fn finish(&self, _processed: usize) {
        self.bar.finish_and_clear();
    }
}
