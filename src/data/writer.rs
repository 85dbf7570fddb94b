use std::path::Path;

use super::model::{Table, cell};
use crate::error::{DatasetError, Result};

/// Write `table` as CSV, overwriting `path` wholesale.
///
/// Parent directories are created as needed. The header is `table.columns` in
/// order; booleans are written as `True`/`False` and nulls as empty fields.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let csv_err = |source: csv::Error| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(&table.columns).map_err(csv_err)?;
    for row in &table.rows {
        writer
            .write_record(table.columns.iter().map(|c| cell(row, c).to_field()))
            .map_err(csv_err)?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} rows x {} columns to {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(())
}
