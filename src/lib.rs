//! Unifies per-modality music-emotion metadata (audio, lyrics, bimodal) into
//! one table keyed by `Merge_id`, consolidates train/validate/test split
//! assignments per modality and selects balanced subsets.

pub mod balance;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod scores;
pub mod splits;
pub mod unify;
pub mod validate;
