use std::fmt;

use serde::Deserialize;

use super::columns::{LYRIC_ID, SONG_ID};
use super::model::{Row, id_of};

// ---------------------------------------------------------------------------
// Modality – which per-modality source a table came from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Audio,
    Lyrics,
    Bimodal,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Audio, Modality::Lyrics, Modality::Bimodal];

    /// Key column identifying a record of this modality. Bimodal records are
    /// addressed by their audio identity.
    pub fn id_column(self) -> &'static str {
        match self {
            Modality::Audio | Modality::Bimodal => SONG_ID,
            Modality::Lyrics => LYRIC_ID,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Audio => "audio",
            Modality::Lyrics => "lyrics",
            Modality::Bimodal => "bimodal",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RecordKind – classification from id presence alone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    AudioOnly,
    LyricsOnly,
    Bimodal,
}

impl RecordKind {
    /// Classify a unified row by which of `Song_id` / `Lyric_id` are present.
    /// Rows with neither id have no kind.
    pub fn of_row(row: &Row) -> Option<RecordKind> {
        match (id_of(row, SONG_ID), id_of(row, LYRIC_ID)) {
            (Some(_), Some(_)) => Some(RecordKind::Bimodal),
            (Some(_), None) => Some(RecordKind::AudioOnly),
            (None, Some(_)) => Some(RecordKind::LyricsOnly),
            (None, None) => None,
        }
    }

    pub fn has_audio(self) -> bool {
        matches!(self, RecordKind::AudioOnly | RecordKind::Bimodal)
    }

    pub fn has_lyrics(self) -> bool {
        matches!(self, RecordKind::LyricsOnly | RecordKind::Bimodal)
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordKind::AudioOnly => "Audio Only",
            RecordKind::LyricsOnly => "Lyrics Only",
            RecordKind::Bimodal => "Bimodal",
        }
    }
}

// ---------------------------------------------------------------------------
// Identity – a record's place in the unified id space
// ---------------------------------------------------------------------------

/// Exactly one of the three id states a unified record can be in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Bimodal { song_id: String, lyric_id: String },
    AudioOnly { song_id: String },
    LyricsOnly { lyric_id: String },
}

impl Identity {
    pub fn from_ids(song_id: Option<String>, lyric_id: Option<String>) -> Option<Identity> {
        match (song_id, lyric_id) {
            (Some(song_id), Some(lyric_id)) => Some(Identity::Bimodal { song_id, lyric_id }),
            (Some(song_id), None) => Some(Identity::AudioOnly { song_id }),
            (None, Some(lyric_id)) => Some(Identity::LyricsOnly { lyric_id }),
            (None, None) => None,
        }
    }

    /// `Song_id_Lyric_id` for bimodal records, otherwise the single id.
    pub fn merge_id(&self) -> String {
        match self {
            Identity::Bimodal { song_id, lyric_id } => format!("{song_id}_{lyric_id}"),
            Identity::AudioOnly { song_id } => song_id.clone(),
            Identity::LyricsOnly { lyric_id } => lyric_id.clone(),
        }
    }

    pub fn song_id(&self) -> Option<&str> {
        match self {
            Identity::Bimodal { song_id, .. } | Identity::AudioOnly { song_id } => Some(song_id),
            Identity::LyricsOnly { .. } => None,
        }
    }

    pub fn lyric_id(&self) -> Option<&str> {
        match self {
            Identity::Bimodal { lyric_id, .. } | Identity::LyricsOnly { lyric_id } => Some(lyric_id),
            Identity::AudioOnly { .. } => None,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Identity::Bimodal { .. } => RecordKind::Bimodal,
            Identity::AudioOnly { .. } => RecordKind::AudioOnly,
            Identity::LyricsOnly { .. } => RecordKind::LyricsOnly,
        }
    }
}
