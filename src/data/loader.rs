use std::path::Path;

use serde_json::Value as JsonValue;

use super::columns::ID_COLUMNS;
use super::model::{Row, Table, Value};
use crate::error::{DatasetError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – header row required, one record per line
/// * `.json` – `[{ "Song_id": "...", "Quadrant": "Q1", ... }, ...]`
///
/// A path that does not exist fails with [`DatasetError::MissingFile`] before
/// anything is opened.
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(DatasetError::MissingFile(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        other => return Err(DatasetError::UnsupportedFormat(other.to_string())),
    };
    log::debug!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

/// Display label for a table loaded from `path`.
fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, every other row a record.
/// Cell types are inferred per cell except in identifier columns, which keep
/// their text. Empty cells are null.
fn load_csv(path: &Path) -> Result<Table> {
    let csv_err = |source: csv::Error| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let row: Row = columns
            .iter()
            .zip(record.iter())
            .map(|(col, raw)| {
                let value = if is_id_column(col) { Value::text(raw) } else { Value::parse(raw) };
                (col.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(Table::from_rows(table_name(path), columns, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Song_id": "MT0000004637", "Quadrant": "Q1", "Arousal": 0.61 },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen order across the records.
fn load_json(path: &Path) -> Result<Table> {
    let json_err = |source: serde_json::Error| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    };

    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text).map_err(json_err)?;

    let records = match root {
        JsonValue::Array(records) => records,
        _ => {
            return Err(json_err(serde::de::Error::custom(
                "expected top-level JSON array",
            )))
        }
    };

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.into_iter().enumerate() {
        let JsonValue::Object(obj) = rec else {
            return Err(json_err(serde::de::Error::custom(format!(
                "row {i} is not a JSON object"
            ))));
        };

        let mut row = Row::new();
        for (key, val) in obj {
            if !columns.contains(&key) {
                columns.push(key.clone());
            }
            let value = match &val {
                JsonValue::Number(n) if is_id_column(&key) => Value::String(n.to_string()),
                other => json_to_value(other),
            };
            row.insert(key, value);
        }
        rows.push(row);
    }

    Ok(Table::from_rows(table_name(path), columns, rows))
}

fn is_id_column(column: &str) -> bool {
    ID_COLUMNS.contains(&column)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_reported_with_path() {
        let path = Path::new("/definitely/not/here/merge_audio.csv");
        match load_table(path) {
            Err(DatasetError::MissingFile(p)) => assert_eq!(p, path),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_load_csv_infers_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge_audio.csv");
        std::fs::write(
            &path,
            "Song_id,Quadrant,Arousal,in_audio_balanced\nMT001,Q1,0.5,True\nMT002,Q3,,False\n",
        )
        .unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.name, "merge_audio.csv");
        assert_eq!(table.columns, vec!["Song_id", "Quadrant", "Arousal", "in_audio_balanced"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "Arousal"), &Value::Float(0.5));
        assert_eq!(table.value(1, "Arousal"), &Value::Null);
        assert_eq!(table.count_true("in_audio_balanced"), 1);
    }

    #[test]
    fn test_csv_round_trip_keeps_id_and_number_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = "Song_id,Lyric_id,Arousal,Title\n1.50,007,0.100,1e3\n1e3,true,0.5,x\ntrue,L3,,y\n";
        let path = dir.path().join("merge_audio.csv");
        std::fs::write(&path, input).unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.value(0, "Song_id"), &Value::from("1.50"));
        assert_eq!(table.value(2, "Song_id"), &Value::from("true"));
        assert_eq!(table.value(1, "Lyric_id"), &Value::from("true"));
        assert_eq!(table.value(1, "Arousal"), &Value::Float(0.5));

        let out = dir.path().join("copy.csv");
        crate::data::writer::write_csv(&table, &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), input);
    }

    #[test]
    fn test_json_numeric_ids_become_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge_audio.json");
        std::fs::write(&path, r#"[{"Song_id": 1.5, "Arousal": 2}]"#).unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.value(0, "Song_id"), &Value::from("1.5"));
        assert_eq!(table.value(0, "Arousal"), &Value::Integer(2));
    }

    #[test]
    fn test_load_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge_lyrics.json");
        std::fs::write(
            &path,
            r#"[{"Lyric_id": "L1", "Valence": 0.25}, {"Lyric_id": "L2", "Quadrant": "Q2"}]"#,
        )
        .unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("Quadrant"));
        assert_eq!(table.value(0, "Quadrant"), &Value::Null);
        assert_eq!(table.value(0, "Valence"), &Value::Float(0.25));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splits.xlsx");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load_table(&path),
            Err(DatasetError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }
}
