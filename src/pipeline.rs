//! Stage orchestration: load → scores → unify → splits → balance.
//!
//! Each stage writes its output before the next one starts, so a failure in a
//! later stage leaves earlier outputs in place. Re-running overwrites them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::balance::select_balanced;
use crate::config::PipelineConfig;
use crate::data::identity::Modality;
use crate::data::loader::load_table;
use crate::data::model::Table;
use crate::data::writer::write_csv;
use crate::scores::{ScoreMergeStats, merge_scores};
use crate::splits::{SplitCell, SplitSources, annotate_splits, orphan_ids, overlap_violations, split_table_path};
use crate::unify::unify;
use crate::validate::{BalancedReport, UnifiedReport, check_balanced, check_unified, ensure_unique_merge_ids};

/// The three per-modality complete tables.
#[derive(Debug, Clone)]
pub struct ModalityTables {
    pub audio: Table,
    pub lyrics: Table,
    pub bimodal: Table,
}

impl ModalityTables {
    pub fn get(&self, modality: Modality) -> &Table {
        match modality {
            Modality::Audio => &self.audio,
            Modality::Lyrics => &self.lyrics,
            Modality::Bimodal => &self.bimodal,
        }
    }

    fn get_mut(&mut self, modality: Modality) -> &mut Table {
        match modality {
            Modality::Audio => &mut self.audio,
            Modality::Lyrics => &mut self.lyrics,
            Modality::Bimodal => &mut self.bimodal,
        }
    }
}

/// Result of one modality × ratio split consolidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub modality: Modality,
    pub ratio: String,
    pub path: PathBuf,
    pub rows: usize,
    /// Records in more than one split under one sampling policy.
    pub overlaps: usize,
    /// Ids per cell with no matching record.
    pub orphans: BTreeMap<SplitCell, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub scores: Vec<(Modality, ScoreMergeStats)>,
    pub unified: UnifiedReport,
    pub splits: Vec<SplitOutcome>,
    pub balanced: BalancedReport,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order.
    pub fn run(&self) -> Result<PipelineReport> {
        let (tables, scores) = self.load_inputs()?;
        let (mut unified, unified_report) = self.unify_stage(&tables)?;
        let splits = self.split_stage(&tables)?;
        let balanced = self.balance_stage(&mut unified)?;

        Ok(PipelineReport {
            scores,
            unified: unified_report,
            splits,
            balanced,
        })
    }

    /// Load the modality tables and merge configured score tables into them.
    pub fn load_inputs(&self) -> Result<(ModalityTables, Vec<(Modality, ScoreMergeStats)>)> {
        let inputs = &self.config.inputs;
        let load = |modality: Modality| -> Result<Table> {
            let path = inputs.for_modality(modality);
            load_table(path).with_context(|| format!("loading {modality} table {}", path.display()))
        };
        let mut tables = ModalityTables {
            audio: load(Modality::Audio)?,
            lyrics: load(Modality::Lyrics)?,
            bimodal: load(Modality::Bimodal)?,
        };

        let mut stats = Vec::with_capacity(self.config.scores.len());
        for source in &self.config.scores {
            let scores = load_table(&source.path)
                .with_context(|| format!("loading scores {}", source.path.display()))?;
            let base = tables.get_mut(source.modality);
            let (merged, merge_stats) =
                merge_scores(base, &scores, source.modality.id_column(), &source.key)
                    .with_context(|| format!("merging scores into {} table", source.modality))?;
            if !merge_stats.missing.is_empty() {
                log::warn!(
                    "{}: {} records without scores",
                    source.modality,
                    merge_stats.missing.len()
                );
            }
            *base = merged;
            stats.push((source.modality, merge_stats));
        }
        Ok((tables, stats))
    }

    /// Build, check and persist the unified table.
    pub fn unify_stage(&self, tables: &ModalityTables) -> Result<(Table, UnifiedReport)> {
        let unified = unify(&tables.audio, &tables.lyrics, &tables.bimodal).context("unifying modality tables")?;
        ensure_unique_merge_ids(&unified).context("unified table failed validation, not written")?;

        let report = check_unified(&unified)?;
        if !report.is_clean() {
            log::warn!("unified table: {} identity violations", report.violations.len());
        }

        let path = &self.config.outputs.unified;
        write_csv(&unified, path).with_context(|| format!("writing {}", path.display()))?;
        Ok((unified, report))
    }

    /// Consolidate split assignments for every configured modality and ratio.
    pub fn split_stage(&self, tables: &ModalityTables) -> Result<Vec<SplitOutcome>> {
        let splits = &self.config.splits;
        let mut outcomes = Vec::new();
        for &modality in &splits.modalities {
            let records = tables.get(modality);
            for ratio in &splits.ratios {
                let sources = SplitSources::load(&splits.source_dir, ratio, modality)
                    .with_context(|| format!("loading {modality} {ratio} split files"))?;
                if sources.is_empty() {
                    log::warn!("{modality} {ratio}: no split files found");
                }

                let table = annotate_splits(records, modality, &sources)
                    .with_context(|| format!("annotating {modality} {ratio} splits"))?;
                let overlaps = overlap_violations(&table, modality.id_column());
                if !overlaps.is_empty() {
                    log::warn!(
                        "{modality} {ratio}: {} records assigned to more than one split",
                        overlaps.len()
                    );
                }
                let orphans = orphan_ids(records, modality, &sources)?;
                for (cell, ids) in &orphans {
                    log::warn!("{modality} {ratio} {cell}: {} ids not in the {modality} table", ids.len());
                }

                let path = split_table_path(&self.config.outputs.splits_dir, modality, ratio);
                write_csv(&table, &path).with_context(|| format!("writing {}", path.display()))?;
                outcomes.push(SplitOutcome {
                    modality,
                    ratio: ratio.clone(),
                    path,
                    rows: table.len(),
                    overlaps: overlaps.len(),
                    orphans,
                });
            }
        }
        Ok(outcomes)
    }

    /// Select the balanced subsets and rewrite the unified table with them.
    pub fn balance_stage(&self, unified: &mut Table) -> Result<BalancedReport> {
        let balance = &self.config.balance;
        let mut rng = match balance.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let selection = select_balanced(unified, &balance.targets, &mut rng)
            .context("balanced selection failed, unified table left without balanced columns")?;
        selection.apply(unified);

        let report = check_balanced(unified, &balance.targets);
        if !report.is_clean() {
            log::warn!(
                "balanced columns: audio={}, lyrics={}, bimodal={}, {} subset violations",
                report.audio,
                report.lyrics,
                report.bimodal,
                report.subset_violations.len()
            );
        }

        let path = &self.config.outputs.unified;
        write_csv(unified, path).with_context(|| format!("writing {}", path.display()))?;
        Ok(report)
    }
}
