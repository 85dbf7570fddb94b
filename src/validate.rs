//! Read-only structural checks over produced tables. Nothing here mutates its
//! input; findings are returned for the caller to log or act on.

use std::collections::HashMap;

use crate::balance::BalanceTargets;
use crate::data::columns::{
    BIMODAL, IN_AUDIO_BALANCED, IN_BIMODAL_BALANCED, IN_LYRICS_BALANCED, LYRIC_ID, MERGE_ID, SONG_ID,
};
use crate::data::identity::{Identity, RecordKind};
use crate::data::model::{Table, cell, flag_of, id_of};
use crate::data::{DatasetError, Result};
use crate::unify::KindCounts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityViolation {
    /// Neither `Song_id` nor `Lyric_id` present.
    NoIdentity { row: usize },
    /// `Merge_id` does not match the id columns.
    MergeIdMismatch { row: usize, expected: String, actual: Option<String> },
    /// `bimodal` flag disagrees with id presence.
    FlagMismatch { row: usize, flag: bool, kind: RecordKind },
}

/// Findings over a unified table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedReport {
    pub rows: usize,
    pub counts: KindCounts,
    /// Merge ids occurring more than once, sorted.
    pub duplicate_merge_ids: Vec<String>,
    pub violations: Vec<IdentityViolation>,
}

impl UnifiedReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_merge_ids.is_empty() && self.violations.is_empty()
    }

    /// Bimodal + audio-only + lyrics-only accounts for every row.
    pub fn counts_consistent(&self) -> bool {
        self.counts.total() == self.rows
    }
}

/// Check `Merge_id` uniqueness and identity invariants of a unified table.
pub fn check_unified(table: &Table) -> Result<UnifiedReport> {
    table.require_column(MERGE_ID)?;
    table.require_column(SONG_ID)?;
    table.require_column(LYRIC_ID)?;
    let has_flag = table.has_column(BIMODAL);

    let mut violations = Vec::new();
    for (row_no, row) in table.rows.iter().enumerate() {
        let Some(identity) = Identity::from_ids(id_of(row, SONG_ID), id_of(row, LYRIC_ID)) else {
            violations.push(IdentityViolation::NoIdentity { row: row_no });
            continue;
        };

        let expected = identity.merge_id();
        let actual = id_of(row, MERGE_ID);
        if actual.as_deref() != Some(expected.as_str()) {
            violations.push(IdentityViolation::MergeIdMismatch {
                row: row_no,
                expected,
                actual,
            });
        }

        if has_flag {
            let flag = flag_of(row, BIMODAL);
            let kind = identity.kind();
            if flag != (kind == RecordKind::Bimodal) {
                violations.push(IdentityViolation::FlagMismatch { row: row_no, flag, kind });
            }
        }
    }

    Ok(UnifiedReport {
        rows: table.len(),
        counts: KindCounts::of(table),
        duplicate_merge_ids: duplicate_merge_ids(table),
        violations,
    })
}

fn duplicate_merge_ids(table: &Table) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for row in &table.rows {
        let id = cell(row, MERGE_ID).to_field();
        *seen.entry(id).or_insert(0) += 1;
    }
    let mut dups: Vec<String> = seen.into_iter().filter(|(_, n)| *n > 1).map(|(id, _)| id).collect();
    dups.sort();
    dups
}

/// Fail with [`DatasetError::DuplicateIdentity`] when `Merge_id` repeats.
pub fn ensure_unique_merge_ids(table: &Table) -> Result<()> {
    table.require_column(MERGE_ID)?;
    let dups = duplicate_merge_ids(table);
    match dups.first() {
        Some(first) => Err(DatasetError::DuplicateIdentity {
            count: dups.len(),
            first: first.clone(),
        }),
        None => Ok(()),
    }
}

/// Findings over the balanced columns of a unified table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalancedReport {
    pub audio: usize,
    pub lyrics: usize,
    pub bimodal: usize,
    /// Balanced columns absent from the table (counted as zero).
    pub missing_columns: Vec<&'static str>,
    /// Rows that are bimodal-balanced but not both audio- and lyrics-balanced.
    pub subset_violations: Vec<usize>,
    pub matches_targets: bool,
}

impl BalancedReport {
    pub fn is_clean(&self) -> bool {
        self.matches_targets && self.subset_violations.is_empty()
    }
}

/// Count balanced membership, check bimodal ⊆ audio ∩ lyrics and compare the
/// counts with `targets`.
pub fn check_balanced(table: &Table, targets: &BalanceTargets) -> BalancedReport {
    let mut report = BalancedReport::default();
    for col in [IN_AUDIO_BALANCED, IN_LYRICS_BALANCED, IN_BIMODAL_BALANCED] {
        if !table.has_column(col) {
            log::warn!("{}: column '{col}' not found, counting it as 0", table.name);
            report.missing_columns.push(col);
        }
    }

    for (row_no, row) in table.rows.iter().enumerate() {
        let audio = flag_of(row, IN_AUDIO_BALANCED);
        let lyrics = flag_of(row, IN_LYRICS_BALANCED);
        let bimodal = flag_of(row, IN_BIMODAL_BALANCED);
        report.audio += audio as usize;
        report.lyrics += lyrics as usize;
        report.bimodal += bimodal as usize;
        if bimodal && !(audio && lyrics) {
            report.subset_violations.push(row_no);
        }
    }
    report.matches_targets =
        report.audio == targets.audio && report.lyrics == targets.lyrics && report.bimodal == targets.bimodal;
    report
}
