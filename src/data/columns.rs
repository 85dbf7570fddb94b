//! Column names shared by every table the pipeline reads or writes.
//! Consumers check for these by name, so they must not drift.

pub const MERGE_ID: &str = "Merge_id";
pub const SONG_ID: &str = "Song_id";
pub const LYRIC_ID: &str = "Lyric_id";
pub const BIMODAL: &str = "bimodal";
pub const HAS_AUDIO: &str = "has_audio";
pub const HAS_LYRICS: &str = "has_lyrics";

pub const QUADRANT: &str = "Quadrant";
pub const AROUSAL: &str = "Arousal";
pub const VALENCE: &str = "Valence";
pub const ARTIST: &str = "Artist";
pub const TITLE: &str = "Title";

/// Identifier column of split-assignment files, for every modality.
pub const SPLIT_SONG: &str = "Song";

/// Columns loaded as raw text, never type-inferred.
pub const ID_COLUMNS: [&str; 4] = [MERGE_ID, SONG_ID, LYRIC_ID, SPLIT_SONG];

pub const IN_AUDIO_BALANCED: &str = "in_audio_balanced";
pub const IN_LYRICS_BALANCED: &str = "in_lyrics_balanced";
pub const IN_BIMODAL_BALANCED: &str = "in_bimodal_balanced";

pub const BALANCED_COLUMNS: [&str; 3] = [IN_AUDIO_BALANCED, IN_LYRICS_BALANCED, IN_BIMODAL_BALANCED];
