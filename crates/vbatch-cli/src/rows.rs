//! Reading input records and printing fetched rows

use std::io::Read;
use std::path::Path;

use anyhow::{Context, bail};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use vbatch_core::Row;
use vbatch_values::Record;

/// Read records from a JSON file, or stdin when `path` is `-`
pub fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read rows from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rows from {}", path.display()))?
    };

    parse_records(&text)
}

/// Parse a JSON array of rows.
///
/// Arrays become positional records and objects named records; nested
/// objects inside a row stay mappings until the executor adapts them.
pub fn parse_records(text: &str) -> anyhow::Result<Vec<Record>> {
    let document: serde_json::Value = serde_json::from_str(text).context("rows are not valid JSON")?;

    let serde_json::Value::Array(items) = document else {
        bail!("rows must be a JSON array of arrays or objects");
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            Record::from_json(item).with_context(|| format!("row {} is invalid", index + 1))
        })
        .collect()
}

/// Render rows as a table, columns taken from the first row
pub fn render_table(rows: &[Row]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if let Some(first) = rows.first() {
        table.set_header(first.columns().to_vec());
    }
    for row in rows {
        table.add_row(row.values.iter().map(|value| value.to_string()));
    }

    table
}
