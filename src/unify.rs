use std::collections::HashSet;

use crate::data::columns::{BIMODAL, HAS_AUDIO, HAS_LYRICS, LYRIC_ID, MERGE_ID, SONG_ID};
use crate::data::identity::{Identity, RecordKind};
use crate::data::model::{Row, Table, Value, id_of};
use crate::data::Result;

/// Leading columns of every unified table, in output order.
pub const UNIFIED_KEY_COLUMNS: [&str; 6] = [MERGE_ID, SONG_ID, LYRIC_ID, BIMODAL, HAS_AUDIO, HAS_LYRICS];

/// Per-kind row counts of a unified table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub bimodal: usize,
    pub audio_only: usize,
    pub lyrics_only: usize,
}

impl KindCounts {
    pub fn of(table: &Table) -> Self {
        let mut counts = KindCounts::default();
        for row in &table.rows {
            match RecordKind::of_row(row) {
                Some(RecordKind::Bimodal) => counts.bimodal += 1,
                Some(RecordKind::AudioOnly) => counts.audio_only += 1,
                Some(RecordKind::LyricsOnly) => counts.lyrics_only += 1,
                None => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.bimodal + self.audio_only + self.lyrics_only
    }
}

/// Merge the per-modality tables into one table with a row per identity.
///
/// Bimodal records come first, then audio records whose `Song_id` is not
/// paired, then lyrics records whose `Lyric_id` is not paired. Source order is
/// preserved inside each block. Rows with a null key are skipped with a
/// warning.
pub fn unify(audio: &Table, lyrics: &Table, bimodal: &Table) -> Result<Table> {
    audio.require_column(SONG_ID)?;
    lyrics.require_column(LYRIC_ID)?;
    bimodal.require_column(SONG_ID)?;
    bimodal.require_column(LYRIC_ID)?;

    let paired = keyed_rows(bimodal, |row| {
        Identity::from_ids(id_of(row, SONG_ID), id_of(row, LYRIC_ID))
            .filter(|id| id.kind() == RecordKind::Bimodal)
    });
    // Only kept pairs shadow their audio/lyrics records; a dropped bimodal row
    // leaves them in the single-modality blocks.
    let paired_songs: HashSet<String> = paired.iter().filter_map(|(id, _)| id.song_id().map(str::to_owned)).collect();
    let paired_lyrics: HashSet<String> = paired.iter().filter_map(|(id, _)| id.lyric_id().map(str::to_owned)).collect();
    let audio_only = keyed_rows(audio, |row| {
        id_of(row, SONG_ID).map(|song_id| Identity::AudioOnly { song_id })
    })
    .into_iter()
    .filter(|(id, _)| id.song_id().is_some_and(|s| !paired_songs.contains(s)));
    let lyrics_only = keyed_rows(lyrics, |row| {
        id_of(row, LYRIC_ID).map(|lyric_id| Identity::LyricsOnly { lyric_id })
    })
    .into_iter()
    .filter(|(id, _)| id.lyric_id().is_some_and(|l| !paired_lyrics.contains(l)));

    let rows: Vec<Row> = paired
        .into_iter()
        .chain(audio_only)
        .chain(lyrics_only)
        .map(|(identity, source)| unified_row(&identity, source))
        .collect();

    let table = Table::from_rows(
        "unified",
        unified_columns(&[bimodal, audio, lyrics]),
        rows,
    );

    let counts = KindCounts::of(&table);
    log::info!(
        "Unified {} records: {} bimodal, {} audio-only, {} lyrics-only",
        table.len(),
        counts.bimodal,
        counts.audio_only,
        counts.lyrics_only
    );
    Ok(table)
}

/// Pair each row with its identity, dropping rows that have none.
fn keyed_rows<'a>(
    table: &'a Table,
    identify: impl Fn(&Row) -> Option<Identity>,
) -> Vec<(Identity, &'a Row)> {
    let mut skipped = 0usize;
    let keyed: Vec<(Identity, &Row)> = table
        .rows
        .iter()
        .filter_map(|row| {
            let id = identify(row);
            if id.is_none() {
                skipped += 1;
            }
            id.map(|id| (id, row))
        })
        .collect();
    if skipped > 0 {
        log::warn!("{}: skipped {skipped} rows with a null identifier", table.name);
    }
    keyed
}

fn unified_row(identity: &Identity, source: &Row) -> Row {
    let kind = identity.kind();
    let mut row = source.clone();
    row.insert(MERGE_ID.to_string(), Value::String(identity.merge_id()));
    row.insert(SONG_ID.to_string(), identity.song_id().map(Value::from).unwrap_or(Value::Null));
    row.insert(LYRIC_ID.to_string(), identity.lyric_id().map(Value::from).unwrap_or(Value::Null));
    row.insert(BIMODAL.to_string(), Value::Bool(kind == RecordKind::Bimodal));
    row.insert(HAS_AUDIO.to_string(), Value::Bool(kind.has_audio()));
    row.insert(HAS_LYRICS.to_string(), Value::Bool(kind.has_lyrics()));
    row
}

/// Key columns followed by every source column in first-seen order.
fn unified_columns(sources: &[&Table]) -> Vec<String> {
    let mut seen: HashSet<&str> = UNIFIED_KEY_COLUMNS.iter().copied().collect();
    let mut columns: Vec<String> = UNIFIED_KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
    for table in sources {
        for col in &table.columns {
            if seen.insert(col.as_str()) {
                columns.push(col.clone());
            }
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::cell;
    use crate::error::DatasetError;

    fn make_table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
        let rows = rows
            .iter()
            .map(|values| {
                columns
                    .iter()
                    .zip(values.iter())
                    .map(|(c, v)| (c.to_string(), Value::parse(v)))
                    .collect()
            })
            .collect();
        Table::from_rows(name, columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn scenario() -> (Table, Table, Table) {
        let audio = make_table(
            "audio",
            &["Song_id", "Artist", "Quadrant"],
            &[&["A1", "Ana", "Q1"], &["A2", "Bo", "Q2"], &["A3", "Cy", "Q3"]],
        );
        let lyrics = make_table(
            "lyrics",
            &["Lyric_id", "Artist", "Quadrant"],
            &[&["L1", "Ana", "Q1"], &["L2", "Di", "Q4"]],
        );
        let bimodal = make_table(
            "bimodal",
            &["Song_id", "Lyric_id", "Artist", "Quadrant"],
            &[&["A1", "L1", "Ana", "Q1"]],
        );
        (audio, lyrics, bimodal)
    }

    fn merge_ids(table: &Table) -> Vec<String> {
        table.rows.iter().map(|r| cell(r, MERGE_ID).to_field()).collect()
    }

    #[test]
    fn test_unify_scenario() {
        let (audio, lyrics, bimodal) = scenario();
        let unified = unify(&audio, &lyrics, &bimodal).unwrap();

        assert_eq!(merge_ids(&unified), vec!["A1_L1", "A2", "A3", "L2"]);
        let flags: Vec<bool> = unified.rows.iter().map(|r| cell(r, BIMODAL).as_bool().unwrap()).collect();
        assert_eq!(flags, vec![true, false, false, false]);

        assert_eq!(unified.value(1, LYRIC_ID), &Value::Null);
        assert_eq!(unified.value(3, SONG_ID), &Value::Null);
        assert_eq!(unified.value(3, "Artist"), &Value::from("Di"));
        assert_eq!(unified.value(1, HAS_AUDIO), &Value::Bool(true));
        assert_eq!(unified.value(1, HAS_LYRICS), &Value::Bool(false));
    }

    #[test]
    fn test_unified_column_order() {
        let (audio, lyrics, bimodal) = scenario();
        let unified = unify(&audio, &lyrics, &bimodal).unwrap();
        assert_eq!(
            unified.columns,
            vec!["Merge_id", "Song_id", "Lyric_id", "bimodal", "has_audio", "has_lyrics", "Artist", "Quadrant"]
        );
    }

    #[test]
    fn test_merge_ids_unique_and_kinds_partition() {
        let (audio, lyrics, bimodal) = scenario();
        let unified = unify(&audio, &lyrics, &bimodal).unwrap();

        let ids: HashSet<String> = merge_ids(&unified).into_iter().collect();
        assert_eq!(ids.len(), unified.len());

        let counts = KindCounts::of(&unified);
        assert_eq!(counts, KindCounts { bimodal: 1, audio_only: 2, lyrics_only: 1 });
        assert_eq!(counts.total(), unified.len());

        for row in &unified.rows {
            let kind = RecordKind::of_row(row).unwrap();
            assert_eq!(cell(row, BIMODAL).as_bool(), Some(kind == RecordKind::Bimodal));
        }
    }

    #[test]
    fn test_unify_is_deterministic() {
        let (audio, lyrics, bimodal) = scenario();
        let first = unify(&audio, &lyrics, &bimodal).unwrap();
        let second = unify(&audio, &lyrics, &bimodal).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_null_keys_are_skipped() {
        let audio = make_table("audio", &["Song_id", "Title"], &[&["A1", "x"], &["", "orphan"]]);
        let lyrics = make_table("lyrics", &["Lyric_id"], &[]);
        let bimodal = make_table("bimodal", &["Song_id", "Lyric_id"], &[&["", "L9"]]);
        let unified = unify(&audio, &lyrics, &bimodal).unwrap();
        assert_eq!(merge_ids(&unified), vec!["A1"]);
    }

    #[test]
    fn test_incomplete_bimodal_row_falls_back_to_single_modality() {
        let audio = make_table("audio", &["Song_id"], &[&["A1"], &["A2"]]);
        let lyrics = make_table("lyrics", &["Lyric_id"], &[&["L1"]]);
        let bimodal = make_table("bimodal", &["Song_id", "Lyric_id"], &[&["A1", ""], &["", "L1"]]);
        let unified = unify(&audio, &lyrics, &bimodal).unwrap();
        assert_eq!(merge_ids(&unified), vec!["A1", "A2", "L1"]);
        assert_eq!(KindCounts::of(&unified), KindCounts { bimodal: 0, audio_only: 2, lyrics_only: 1 });
    }

    #[test]
    fn test_missing_key_column_aborts() {
        let (audio, lyrics, _) = scenario();
        let bimodal = make_table("bimodal", &["Song_id"], &[&["A1"]]);
        match unify(&audio, &lyrics, &bimodal) {
            Err(DatasetError::MissingColumn { table, column }) => {
                assert_eq!(table, "bimodal");
                assert_eq!(column, LYRIC_ID);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_source_ids_overridden_for_lyrics_only() {
        // Lyrics exports sometimes carry a stale Song_id column.
        let audio = make_table("audio", &["Song_id"], &[]);
        let lyrics = make_table("lyrics", &["Lyric_id", "Song_id"], &[&["L5", "A77"]]);
        let bimodal = make_table("bimodal", &["Song_id", "Lyric_id"], &[]);
        let unified = unify(&audio, &lyrics, &bimodal).unwrap();
        assert_eq!(unified.value(0, SONG_ID), &Value::Null);
        assert_eq!(unified.value(0, MERGE_ID), &Value::from("L5"));
    }
}
