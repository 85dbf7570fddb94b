use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::balance::BalanceTargets;
use crate::data::identity::Modality;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pipeline.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Pipeline configuration loaded from a TOML file.
/// Every section is optional and falls back to the `metadata/` layout.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Per-modality complete tables.
    pub inputs: InputPaths,
    /// Where produced tables are written.
    pub outputs: OutputPaths,
    /// Split-assignment sources.
    pub splits: SplitConfig,
    /// Balanced-subset targets and seed.
    pub balance: BalanceConfig,
    /// Optional arousal/valence tables merged into modality tables before
    /// unification.
    pub scores: Vec<ScoreSource>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InputPaths {
    pub audio: PathBuf,
    pub lyrics: PathBuf,
    pub bimodal: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            audio: PathBuf::from("metadata/base/merge_audio.csv"),
            lyrics: PathBuf::from("metadata/base/merge_lyrics.csv"),
            bimodal: PathBuf::from("metadata/base/merge_bimodal.csv"),
        }
    }
}

impl InputPaths {
    pub fn for_modality(&self, modality: Modality) -> &Path {
        match modality {
            Modality::Audio => &self.audio,
            Modality::Lyrics => &self.lyrics,
            Modality::Bimodal => &self.bimodal,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputPaths {
    /// Unified table, rewritten with balanced columns by the last stage.
    pub unified: PathBuf,
    /// Root of `<modality>/tvt_<ratio>.csv` split tables.
    pub splits_dir: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            unified: PathBuf::from("metadata/base/merge_unified.csv"),
            splits_dir: PathBuf::from("metadata/splits"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Directory holding `tvt_<ratio>_<split>_<modality>_<sampling>.csv` files.
    pub source_dir: PathBuf,
    /// Split ratios to consolidate, e.g. `40_30_30`.
    pub ratios: Vec<String>,
    pub modalities: Vec<Modality>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("metadata/last/lastsplits"),
            ratios: vec!["40_30_30".to_string(), "70_15_15".to_string()],
            modalities: Modality::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BalanceConfig {
    #[serde(flatten)]
    pub targets: BalanceTargets,
    /// Fixed seed for reproducible selection. None = OS entropy.
    pub seed: Option<u64>,
}

/// An arousal/valence table to merge into one modality.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoreSource {
    pub modality: Modality,
    pub path: PathBuf,
    /// Identifier column in the score table.
    #[serde(default = "default_score_key")]
    pub key: String,
}

fn default_score_key() -> String {
    "Song".to_string()
}

impl PipelineConfig {
    /// Load config from `path`. Relative paths inside it are resolved against
    /// the directory containing the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(root) = path.parent() {
            config.resolve_paths(root);
        }
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Prefix every relative path with `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        resolve(&mut self.inputs.audio);
        resolve(&mut self.inputs.lyrics);
        resolve(&mut self.inputs.bimodal);
        resolve(&mut self.outputs.unified);
        resolve(&mut self.outputs.splits_dir);
        resolve(&mut self.splits.source_dir);
        for score in &mut self.scores {
            resolve(&mut score.path);
        }
    }
}
