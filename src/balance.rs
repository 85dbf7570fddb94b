use rand::Rng;
use serde::Deserialize;

use crate::data::columns::{IN_AUDIO_BALANCED, IN_BIMODAL_BALANCED, IN_LYRICS_BALANCED, LYRIC_ID, SONG_ID};
use crate::data::identity::RecordKind;
use crate::data::model::{Table, Value};
use crate::data::{DatasetError, Result};

/// Target sizes of the balanced subsets of the unified table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BalanceTargets {
    pub audio: usize,
    pub lyrics: usize,
    pub bimodal: usize,
}

impl Default for BalanceTargets {
    fn default() -> Self {
        Self {
            audio: 3232,
            lyrics: 2400,
            bimodal: 2000,
        }
    }
}

impl BalanceTargets {
    /// Every bimodal-balanced record also counts towards audio and lyrics, so
    /// the bimodal target cannot exceed either.
    pub fn validate(&self) -> Result<()> {
        if self.bimodal > self.audio || self.bimodal > self.lyrics {
            return Err(DatasetError::InvalidTargets {
                audio: self.audio,
                lyrics: self.lyrics,
                bimodal: self.bimodal,
            });
        }
        Ok(())
    }
}

/// Balanced-membership flags, one entry per row of the unified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancedSelection {
    pub audio: Vec<bool>,
    pub lyrics: Vec<bool>,
    pub bimodal: Vec<bool>,
}

impl BalancedSelection {
    pub fn counts(&self) -> (usize, usize, usize) {
        let count = |flags: &[bool]| flags.iter().filter(|&&f| f).count();
        (count(&self.audio), count(&self.lyrics), count(&self.bimodal))
    }

    /// Write the selection into `table` as the three `in_*_balanced` columns,
    /// replacing any previous values.
    pub fn apply(self, table: &mut Table) {
        let to_values = |flags: Vec<bool>| flags.into_iter().map(Value::Bool).collect();
        table.set_column(IN_AUDIO_BALANCED, to_values(self.audio));
        table.set_column(IN_LYRICS_BALANCED, to_values(self.lyrics));
        table.set_column(IN_BIMODAL_BALANCED, to_values(self.bimodal));
    }
}

/// Choose the balanced subsets of a unified table.
///
/// `targets.bimodal` bimodal rows are drawn first; they count as both audio-
/// and lyrics-balanced. The remaining audio (lyrics) quota is drawn from rows
/// with a `Song_id` (`Lyric_id`) not already chosen. All draws are uniform
/// and without replacement. Every population is checked before anything is
/// drawn, so a failure leaves no partial selection.
pub fn select_balanced<R: Rng + ?Sized>(
    table: &Table,
    targets: &BalanceTargets,
    rng: &mut R,
) -> Result<BalancedSelection> {
    table.require_column(SONG_ID)?;
    table.require_column(LYRIC_ID)?;
    targets.validate()?;

    let kinds: Vec<Option<RecordKind>> = table.rows.iter().map(RecordKind::of_row).collect();
    let population = |pred: fn(RecordKind) -> bool| -> Vec<usize> {
        kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| k.is_some_and(pred))
            .map(|(i, _)| i)
            .collect()
    };

    let bimodal_pool = population(|k| k == RecordKind::Bimodal);
    let audio_pool = population(RecordKind::has_audio);
    let lyrics_pool = population(RecordKind::has_lyrics);

    let extra_audio = targets.audio - targets.bimodal;
    let extra_lyrics = targets.lyrics - targets.bimodal;
    ensure_population("bimodal", targets.bimodal, bimodal_pool.len())?;
    // bimodal picks are excluded from the follow-up pools
    ensure_population("audio", extra_audio, audio_pool.len() - targets.bimodal)?;
    ensure_population("lyrics", extra_lyrics, lyrics_pool.len() - targets.bimodal)?;

    let n = table.len();
    let mut bimodal = vec![false; n];
    for i in draw(rng, &bimodal_pool, targets.bimodal) {
        bimodal[i] = true;
    }

    let mut audio = bimodal.clone();
    let remaining: Vec<usize> = audio_pool.into_iter().filter(|&i| !bimodal[i]).collect();
    for i in draw(rng, &remaining, extra_audio) {
        audio[i] = true;
    }

    let mut lyrics = bimodal.clone();
    let remaining: Vec<usize> = lyrics_pool.into_iter().filter(|&i| !bimodal[i]).collect();
    for i in draw(rng, &remaining, extra_lyrics) {
        lyrics[i] = true;
    }

    let selection = BalancedSelection { audio, lyrics, bimodal };
    let (a, l, b) = selection.counts();
    log::info!("Balanced selection: audio={a}, lyrics={l}, bimodal={b}");
    Ok(selection)
}

fn ensure_population(population: &'static str, requested: usize, available: usize) -> Result<()> {
    if available < requested {
        return Err(DatasetError::InsufficientPopulation {
            population,
            requested,
            available,
        });
    }
    Ok(())
}

/// Uniform sample of `amount` distinct entries of `pool`.
fn draw<R: Rng + ?Sized>(rng: &mut R, pool: &[usize], amount: usize) -> Vec<usize> {
    rand::seq::index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i])
        .collect()
}
