//! Single wide CSV with repeats spread into indexed columns.

use std::io::Write;

use anyhow::{Context, Result};

use odk_core::FlatTable;

/// Write header rows then data rows of `table`.
pub fn write_flat_csv<W: Write>(writer: W, table: &FlatTable) -> Result<W> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in table.header_rows.iter().chain(&table.rows) {
        csv.write_record(row).context("failed to write flat CSV row")?;
    }
    csv.into_inner()
        .map_err(|err| err.into_error())
        .context("failed to flush flat CSV")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_cells_that_need_it() {
        let table = FlatTable {
            columns: vec!["name".to_string(), "_tags".to_string()],
            header_rows: vec![vec!["name".to_string(), "_tags".to_string()]],
            rows: vec![vec!["Abe".to_string(), "\"a b\", c".to_string()]],
        };
        let bytes = write_flat_csv(Vec::new(), &table).expect("write");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(text, "name,_tags\nAbe,\"\"\"a b\"\", c\"\n");
    }
}
