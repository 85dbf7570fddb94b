use std::collections::HashMap;

use crate::data::columns::{AROUSAL, VALENCE};
use crate::data::model::{Table, Value, cell, id_of};
use crate::data::Result;

/// Outcome of a score merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreMergeStats {
    pub rows: usize,
    pub with_arousal: usize,
    pub with_valence: usize,
    /// Base identifiers for which no score row was found.
    pub missing: Vec<String>,
}

/// Left-join `Arousal`/`Valence` from `scores` onto `base`.
///
/// Rows are matched on `base[base_key] == scores[score_key]`. Existing
/// `Arousal`/`Valence` columns in `base` are overwritten; unmatched rows get
/// nulls. When a key repeats in `scores` the first row wins.
pub fn merge_scores(
    base: &Table,
    scores: &Table,
    base_key: &str,
    score_key: &str,
) -> Result<(Table, ScoreMergeStats)> {
    base.require_column(base_key)?;
    scores.require_column(score_key)?;
    scores.require_column(AROUSAL)?;
    scores.require_column(VALENCE)?;

    for col in [AROUSAL, VALENCE] {
        if base.has_column(col) {
            log::warn!("{}: existing '{col}' column will be overwritten", base.name);
        }
    }

    let mut lookup: HashMap<String, (Value, Value)> = HashMap::with_capacity(scores.len());
    let mut duplicates = 0usize;
    for row in &scores.rows {
        let Some(key) = id_of(row, score_key) else {
            continue;
        };
        if lookup.contains_key(&key) {
            duplicates += 1;
            continue;
        }
        lookup.insert(key, (cell(row, AROUSAL).clone(), cell(row, VALENCE).clone()));
    }
    if duplicates > 0 {
        log::warn!("{}: {duplicates} duplicate '{score_key}' keys ignored", scores.name);
    }

    let mut stats = ScoreMergeStats {
        rows: base.len(),
        ..Default::default()
    };
    let mut arousal = Vec::with_capacity(base.len());
    let mut valence = Vec::with_capacity(base.len());
    for row in &base.rows {
        let key = id_of(row, base_key);
        let (a, v) = key
            .as_ref()
            .and_then(|k| lookup.get(k))
            .cloned()
            .unwrap_or((Value::Null, Value::Null));
        if a.is_null() || v.is_null() {
            stats.missing.push(key.unwrap_or_default());
        }
        if !a.is_null() {
            stats.with_arousal += 1;
        }
        if !v.is_null() {
            stats.with_valence += 1;
        }
        arousal.push(a);
        valence.push(v);
    }

    let mut merged = base.clone();
    merged.set_column(AROUSAL, arousal);
    merged.set_column(VALENCE, valence);

    log::info!(
        "{}: merged scores for {} rows ({} with arousal, {} with valence, {} missing)",
        base.name,
        stats.rows,
        stats.with_arousal,
        stats.with_valence,
        stats.missing.len()
    );
    Ok((merged, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;
    use crate::error::DatasetError;

    fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
        let rows = rows
            .iter()
            .map(|values| {
                columns
                    .iter()
                    .zip(values.iter())
                    .map(|(c, v)| (c.to_string(), Value::parse(v)))
                    .collect::<Row>()
            })
            .collect();
        Table::from_rows(name, columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_left_join_with_missing_scores() {
        let base = table("audio", &["Song_id", "Title"], &[&["A1", "One"], &["A2", "Two"]]);
        let scores = table(
            "av",
            &["Song", "Arousal", "Valence"],
            &[&["A1", "0.7", "0.2"], &["A9", "0.1", "0.1"]],
        );

        let (merged, stats) = merge_scores(&base, &scores, "Song_id", "Song").unwrap();
        assert_eq!(merged.columns, vec!["Song_id", "Title", "Arousal", "Valence"]);
        assert_eq!(merged.value(0, "Arousal"), &Value::Float(0.7));
        assert_eq!(merged.value(1, "Valence"), &Value::Null);
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.with_arousal, 1);
        assert_eq!(stats.missing, vec!["A2".to_string()]);
    }

    #[test]
    fn test_existing_scores_overwritten_and_first_duplicate_wins() {
        let base = table("audio", &["Song_id", "Arousal", "Valence"], &[&["A1", "0.0", "0.0"]]);
        let scores = table(
            "av",
            &["Song", "Arousal", "Valence"],
            &[&["A1", "0.5", "0.6"], &["A1", "0.9", "0.9"]],
        );

        let (merged, _) = merge_scores(&base, &scores, "Song_id", "Song").unwrap();
        assert_eq!(merged.columns.len(), 3);
        assert_eq!(merged.value(0, "Arousal"), &Value::Float(0.5));
        assert_eq!(merged.value(0, "Valence"), &Value::Float(0.6));
    }

    #[test]
    fn test_scores_without_valence_fail() {
        let base = table("audio", &["Song_id"], &[&["A1"]]);
        let scores = table("av", &["Song", "Arousal"], &[&["A1", "0.5"]]);
        assert!(matches!(
            merge_scores(&base, &scores, "Song_id", "Song"),
            Err(DatasetError::MissingColumn { column, .. }) if column == "Valence"
        ));
    }
}
