//! CLI argument definitions for the submission exporter.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "odk-export",
    version,
    about = "Export form submissions to CSV, XLSX and SPSS files",
    long_about = "Export XLSForm submissions to tabular files.\n\n\
                  Every repeat group gets its own sheet linked to its parent by index,\n\
                  or, with the flat CSV format, repeat instances are spread into columns."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export submissions of a form.
    Export(ExportArgs),

    /// List the sections and columns an export of a form would have.
    Sections(SectionsArgs),
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Form definition (pyxform JSON).
    #[arg(long = "form", value_name = "FORM_JSON")]
    pub form: PathBuf,

    /// Submissions as a JSON array or newline-delimited JSON.
    #[arg(long = "data", value_name = "DATA")]
    pub data: PathBuf,

    /// Export format.
    #[arg(long = "format", value_enum, default_value = "csv-zip")]
    pub format: FormatArg,

    /// Output file (default: <FORM_NAME>.<EXT> in the current directory).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Parser)]
pub struct SectionsArgs {
    /// Form definition (pyxform JSON).
    #[arg(long = "form", value_name = "FORM_JSON")]
    pub form: PathBuf,

    /// Format whose sheet naming is shown.
    #[arg(long = "format", value_enum, default_value = "csv-zip")]
    pub format: FormatArg,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

/// Export policies; flags override the config file.
#[derive(Args, Default)]
pub struct PolicyArgs {
    /// TOML file with export options.
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Keep select-multiple answers in one column.
    #[arg(long = "no-split-select-multiples")]
    pub no_split_select_multiples: bool,

    /// Write 1/0 instead of True/False in split choice columns.
    #[arg(long = "binary-select-multiples")]
    pub binary_select_multiples: bool,

    /// Write the choice value instead of True/False in split choice columns.
    #[arg(long = "value-select-multiples")]
    pub value_select_multiples: bool,

    /// Replace choice names with their labels.
    #[arg(long = "show-choice-labels")]
    pub show_choice_labels: bool,

    /// Add a row of question labels under the header.
    #[arg(long = "include-labels")]
    pub include_labels: bool,

    /// Use question labels as the only header row.
    #[arg(long = "labels-only")]
    pub labels_only: bool,

    /// Drop group names from column titles.
    #[arg(long = "remove-group-name")]
    pub remove_group_name: bool,

    /// Shorten column titles to element names (always on for sav-zip).
    #[arg(long = "truncate-group-title")]
    pub truncate_group_title: bool,

    /// Separator between group names in column titles.
    #[arg(long = "group-delimiter", value_enum)]
    pub group_delimiter: Option<DelimiterArg>,

    /// Write media answers as download URLs.
    #[arg(long = "include-images")]
    pub include_images: bool,

    /// Host prefixed to relative media URLs.
    #[arg(long = "host", value_name = "URL")]
    pub host: Option<String>,

    /// Add a row of HXL hashtags.
    #[arg(long = "include-hxl")]
    pub include_hxl: bool,

    /// Add review status columns.
    #[arg(long = "include-reviews")]
    pub include_reviews: bool,

    /// Label language.
    #[arg(long = "language", value_name = "LANG")]
    pub language: Option<String>,

    /// Filler for missing values.
    #[arg(long = "na-rep", value_name = "TEXT")]
    pub na_rep: Option<String>,

    /// Only export these columns (comma separated).
    #[arg(long = "columns", value_delimiter = ',', value_name = "COLUMNS")]
    pub columns: Option<Vec<String>>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    CsvZip,
    Xlsx,
    SavZip,
    FlatCsv,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DelimiterArg {
    Slash,
    Dot,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
