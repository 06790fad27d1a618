use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};
use tracing::{info_span, warn};

use odk_core::ExportBuilder;
use odk_ingest::{RecordCursor, load_export_options, load_form_schema};
use odk_model::{ExportOptions, GroupDelimiter};
use odk_output::{ExportFormat, build_export};

use crate::cli::{DelimiterArg, ExportArgs, FormatArg, PolicyArgs, SectionsArgs};
use crate::progress::CliProgress;
use crate::summary::{align_column, apply_table_style, header_cell};
use crate::types::ExportSummary;

pub fn export_format(format: FormatArg) -> ExportFormat {
    match format {
        FormatArg::CsvZip => ExportFormat::CsvZip,
        FormatArg::Xlsx => ExportFormat::Xlsx,
        FormatArg::SavZip => ExportFormat::SavZip,
        FormatArg::FlatCsv => ExportFormat::FlatCsv,
    }
}

/// Options from the config file (or defaults) with flags applied on top.
pub fn export_options(policy: &PolicyArgs) -> Result<ExportOptions> {
    let mut options = match &policy.config {
        Some(path) => load_export_options(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExportOptions::default(),
    };
    if policy.no_split_select_multiples {
        options.split_select_multiples = false;
    }
    options.binary_select_multiples |= policy.binary_select_multiples;
    options.value_select_multiples |= policy.value_select_multiples;
    options.show_choice_labels |= policy.show_choice_labels;
    options.include_labels |= policy.include_labels;
    options.include_labels_only |= policy.labels_only;
    options.remove_group_name |= policy.remove_group_name;
    options.truncate_group_title |= policy.truncate_group_title;
    options.include_images |= policy.include_images;
    options.include_hxl |= policy.include_hxl;
    options.include_reviews |= policy.include_reviews;
    if let Some(delimiter) = policy.group_delimiter {
        options.group_delimiter = match delimiter {
            DelimiterArg::Slash => GroupDelimiter::Slash,
            DelimiterArg::Dot => GroupDelimiter::Dot,
        };
    }
    if let Some(host) = &policy.host {
        options.host = Some(host.clone());
    }
    if let Some(language) = &policy.language {
        options.target_language = Some(language.clone());
    }
    if let Some(na_rep) = &policy.na_rep {
        options.na_rep = na_rep.clone();
    }
    if let Some(columns) = &policy.columns {
        options.columns = Some(columns.clone());
    }
    Ok(options)
}

pub fn run_export(args: &ExportArgs) -> Result<ExportSummary> {
    let form = load_form_schema(&args.form)
        .with_context(|| format!("failed to load form {}", args.form.display()))?;
    let span = info_span!("export_command", form = %form.name);
    let _guard = span.enter();

    let options = export_options(&args.policy)?;
    let format = export_format(args.format);
    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.{}", form.name, format.extension())));
    let cursor = RecordCursor::open(&args.data)
        .with_context(|| format!("failed to open submissions {}", args.data.display()))?;

    let progress = CliProgress::new(!args.no_progress && io::stderr().is_terminal());
    let result = build_export(&form, &options, cursor, &destination, format, &progress)
        .with_context(|| format!("failed to export {}", destination.display()))?;

    let warning = result.check_records().err().map(|err| err.to_string());
    if let Some(message) = &warning {
        warn!("{message}");
    }
    Ok(ExportSummary {
        destination,
        format,
        result,
        warning,
    })
}

pub fn run_sections(args: &SectionsArgs) -> Result<()> {
    let form = load_form_schema(&args.form)
        .with_context(|| format!("failed to load form {}", args.form.display()))?;
    let format = export_format(args.format);
    let options = format.effective_options(&export_options(&args.policy)?);
    let builder = ExportBuilder::new(&form, options).context("failed to index form")?;

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Section"),
        header_cell("Sheet"),
        header_cell("Columns"),
        header_cell("Titles"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);

    let Some(naming) = format.naming() else {
        // The flat CSV has a single sheet whose columns depend on the data.
        let root = builder.schema().root_section();
        table.add_row(vec![
            Cell::new(&root.name),
            Cell::new(&form.name),
            Cell::new(root.columns.len()),
            Cell::new(titles(root.columns.iter().map(|column| column.title.as_str()))),
        ]);
        println!("{table}");
        return Ok(());
    };
    for layout in builder.layouts(naming) {
        let form_columns: Vec<&str> = layout
            .columns
            .iter()
            .filter(|column| !column.is_extra())
            .map(|column| column.title.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(&layout.section),
            Cell::new(&layout.name),
            Cell::new(layout.columns.len()),
            Cell::new(titles(form_columns.into_iter())),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// The first few titles, comma separated.
fn titles<'a>(titles: impl Iterator<Item = &'a str>) -> String {
    const SHOWN: usize = 6;
    let all: Vec<&str> = titles.collect();
    let mut text = all.iter().take(SHOWN).copied().collect::<Vec<_>>().join(", ");
    if all.len() > SHOWN {
        text.push_str(&format!(", … (+{})", all.len() - SHOWN));
    }
    text
}
