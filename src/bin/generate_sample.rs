use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use mood_merge::data::columns::{AROUSAL, ARTIST, LYRIC_ID, QUADRANT, SONG_ID, SPLIT_SONG, TITLE, VALENCE};
use mood_merge::data::identity::Modality;
use mood_merge::data::model::{Row, Table, Value};
use mood_merge::data::writer::write_csv;
use mood_merge::splits::{Sampling, Split, SplitCell};

const RATIO: &str = "40_30_30";
const AUDIO_RECORDS: usize = 120;
const LYRICS_RECORDS: usize = 90;
const BIMODAL_PAIRS: usize = 60;

const ARTISTS: [&str; 6] = ["Ana Moura", "Mariza", "Xutos", "Madredeus", "Buraka", "Deolinda"];

/// One synthetic song with its emotion annotation.
struct Song {
    artist: &'static str,
    title: String,
    arousal: f64,
    valence: f64,
}

impl Song {
    fn random(rng: &mut StdRng, n: usize) -> Song {
        Song {
            artist: ARTISTS[rng.random_range(0..ARTISTS.len())],
            title: format!("Song {n}"),
            arousal: round3(rng.random_range(0.0..1.0)),
            valence: round3(rng.random_range(0.0..1.0)),
        }
    }

    /// Arousal on x, valence on y; Q1 top right, counter-clockwise.
    fn quadrant(&self) -> &'static str {
        match (self.arousal >= 0.5, self.valence >= 0.5) {
            (true, true) => "Q1",
            (false, true) => "Q2",
            (false, false) => "Q3",
            (true, false) => "Q4",
        }
    }

    fn row(&self, ids: &[(&str, &str)]) -> Row {
        let mut row = Row::new();
        for (column, id) in ids {
            row.insert(column.to_string(), Value::from(*id));
        }
        row.insert(ARTIST.into(), Value::from(self.artist));
        row.insert(TITLE.into(), Value::from(self.title.as_str()));
        row.insert(QUADRANT.into(), Value::from(self.quadrant()));
        row.insert(AROUSAL.into(), Value::Float(self.arousal));
        row.insert(VALENCE.into(), Value::Float(self.valence));
        row
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn columns(ids: &[&str]) -> Vec<String> {
    ids.iter()
        .chain(&[ARTIST, TITLE, QUADRANT, AROUSAL, VALENCE])
        .map(|c| c.to_string())
        .collect()
}

/// Complete split: every record, 40/30/30. Balanced split: the same
/// partition restricted to the first 80% of the shuffled order.
fn split_files(dir: &Path, modality: Modality, records: &Table, rng: &mut StdRng) -> Result<()> {
    let id_column = modality.id_column();
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.shuffle(rng);

    let n = order.len();
    let train_end = n * 4 / 10;
    let validate_end = n * 7 / 10;
    let balanced_limit = n * 8 / 10;

    for split_cell in SplitCell::ALL {
        let range = match split_cell.split {
            Split::Train => 0..train_end,
            Split::Validate => train_end..validate_end,
            Split::Test => validate_end..n,
        };
        let start = range.start;
        let rows = order[range]
            .iter()
            .enumerate()
            .filter(|(pos, _)| split_cell.sampling == Sampling::Complete || start + pos < balanced_limit)
            .map(|(_, &i)| {
                let mut row = Row::new();
                row.insert(SPLIT_SONG.into(), records.value(i, id_column).clone());
                row.insert(QUADRANT.into(), records.value(i, QUADRANT).clone());
                row
            })
            .collect();
        let table = Table::from_rows(
            split_cell.to_string(),
            vec![SPLIT_SONG.to_string(), QUADRANT.to_string()],
            rows,
        );
        write_csv(&table, &dir.join(split_cell.file_name(RATIO, modality)))?;
    }
    Ok(())
}

const CONFIG: &str = r#"[inputs]
audio = "base/merge_audio.csv"
lyrics = "base/merge_lyrics.csv"
bimodal = "base/merge_bimodal.csv"

[outputs]
unified = "base/merge_unified.csv"
splits_dir = "splits"

[splits]
source_dir = "lastsplits"
ratios = ["40_30_30"]
modalities = ["audio", "lyrics", "bimodal"]

[balance]
audio = 100
lyrics = 75
bimodal = 50
seed = 42

[[scores]]
modality = "audio"
path = "base/audio_av_values.csv"
key = "Song"
"#;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    let mut rng = StdRng::seed_from_u64(42);

    let audio_songs: Vec<Song> = (1..=AUDIO_RECORDS).map(|n| Song::random(&mut rng, n)).collect();
    let lyrics_songs: Vec<Song> = (1..=LYRICS_RECORDS).map(|n| Song::random(&mut rng, 1000 + n)).collect();

    let song_id = |n: usize| format!("A{n:03}");
    let lyric_id = |n: usize| format!("L{n:03}");

    let audio = Table::from_rows(
        "merge_audio.csv",
        columns(&[SONG_ID]),
        audio_songs
            .iter()
            .enumerate()
            .map(|(i, s)| s.row(&[(SONG_ID, song_id(i + 1).as_str())]))
            .collect(),
    );
    let lyrics = Table::from_rows(
        "merge_lyrics.csv",
        columns(&[LYRIC_ID]),
        lyrics_songs
            .iter()
            .enumerate()
            .map(|(i, s)| s.row(&[(LYRIC_ID, lyric_id(i + 1).as_str())]))
            .collect(),
    );
    // The first audio and lyrics records are the same songs.
    let bimodal = Table::from_rows(
        "merge_bimodal.csv",
        columns(&[SONG_ID, LYRIC_ID]),
        audio_songs
            .iter()
            .take(BIMODAL_PAIRS)
            .enumerate()
            .map(|(i, s)| s.row(&[(SONG_ID, song_id(i + 1).as_str()), (LYRIC_ID, lyric_id(i + 1).as_str())]))
            .collect(),
    );

    // Re-annotated scores for the audio table.
    let scores = Table::from_rows(
        "audio_av_values.csv",
        vec![SPLIT_SONG.to_string(), AROUSAL.to_string(), VALENCE.to_string()],
        audio_songs
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut row = Row::new();
                row.insert(SPLIT_SONG.into(), Value::from(song_id(i + 1)));
                row.insert(AROUSAL.into(), Value::Float(s.arousal));
                row.insert(VALENCE.into(), Value::Float(s.valence));
                row
            })
            .collect(),
    );

    let base = out_dir.join("base");
    write_csv(&audio, &base.join("merge_audio.csv"))?;
    write_csv(&lyrics, &base.join("merge_lyrics.csv"))?;
    write_csv(&bimodal, &base.join("merge_bimodal.csv"))?;
    write_csv(&scores, &base.join("audio_av_values.csv"))?;

    let split_dir = out_dir.join("lastsplits");
    split_files(&split_dir, Modality::Audio, &audio, &mut rng)?;
    split_files(&split_dir, Modality::Lyrics, &lyrics, &mut rng)?;
    split_files(&split_dir, Modality::Bimodal, &bimodal, &mut rng)?;

    let config_path = out_dir.join("pipeline.toml");
    std::fs::write(&config_path, CONFIG).with_context(|| format!("writing {}", config_path.display()))?;

    println!(
        "Wrote {AUDIO_RECORDS} audio, {LYRICS_RECORDS} lyrics and {BIMODAL_PAIRS} bimodal records to {}",
        out_dir.display()
    );
    println!("Run: mood-merge {}", config_path.display());
    Ok(())
}
