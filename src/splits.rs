//! Train/validate/test membership per modality.
//!
//! Split assignments arrive as one file per cell of the
//! {balanced, complete} × {train, validate, test} grid, each listing record
//! ids in a `Song` column. Annotation turns them into six boolean columns on
//! the modality's own records.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::data::columns::{QUADRANT, SPLIT_SONG};
use crate::data::identity::Modality;
use crate::data::loader::load_table;
use crate::data::model::{Row, Table, Value, cell, flag_of, id_of};
use crate::data::{DatasetError, Result};

// ---------------------------------------------------------------------------
// Grid coordinates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sampling {
    Balanced,
    Complete,
}

impl Sampling {
    pub const ALL: [Sampling; 2] = [Sampling::Balanced, Sampling::Complete];

    pub fn as_str(self) -> &'static str {
        match self {
            Sampling::Balanced => "balanced",
            Sampling::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Split {
    Train,
    Validate,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Validate, Split::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validate => "validate",
            Split::Test => "test",
        }
    }
}

/// One cell of the sampling × split grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SplitCell {
    pub sampling: Sampling,
    pub split: Split,
}

impl SplitCell {
    /// Output column order.
    pub const ALL: [SplitCell; 6] = [
        SplitCell::new(Sampling::Balanced, Split::Train),
        SplitCell::new(Sampling::Balanced, Split::Validate),
        SplitCell::new(Sampling::Balanced, Split::Test),
        SplitCell::new(Sampling::Complete, Split::Train),
        SplitCell::new(Sampling::Complete, Split::Validate),
        SplitCell::new(Sampling::Complete, Split::Test),
    ];

    pub const fn new(sampling: Sampling, split: Split) -> Self {
        SplitCell { sampling, split }
    }

    /// `in_<sampling>_<split>`, e.g. `in_balanced_train`.
    pub fn column_name(self) -> String {
        format!("in_{}_{}", self.sampling.as_str(), self.split.as_str())
    }

    /// Source file for this cell: `tvt_<ratio>_<split>_<modality>_<sampling>.csv`.
    pub fn file_name(self, ratio: &str, modality: Modality) -> String {
        format!(
            "tvt_{ratio}_{}_{}_{}.csv",
            self.split.as_str(),
            modality.as_str(),
            self.sampling.as_str()
        )
    }
}

impl fmt::Display for SplitCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.sampling.as_str(), self.split.as_str())
    }
}

/// Output path of a modality's consolidated split table:
/// `<splits_dir>/<modality>/tvt_<ratio>.csv`.
pub fn split_table_path(splits_dir: &Path, modality: Modality, ratio: &str) -> PathBuf {
    splits_dir.join(modality.as_str()).join(format!("tvt_{ratio}.csv"))
}

// ---------------------------------------------------------------------------
// Split sources
// ---------------------------------------------------------------------------

/// Split-assignment tables keyed by cell. An absent cell means no records were
/// assigned to it.
#[derive(Debug, Clone, Default)]
pub struct SplitSources {
    cells: BTreeMap<SplitCell, Table>,
}

impl SplitSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: SplitCell, table: Table) {
        self.cells.insert(cell, table);
    }

    pub fn get(&self, cell: SplitCell) -> Option<&Table> {
        self.cells.get(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Load every cell file for `modality` at `ratio` from `dir`.
    /// Missing files are logged and left out; any other failure aborts.
    pub fn load(dir: &Path, ratio: &str, modality: Modality) -> Result<Self> {
        let mut sources = SplitSources::new();
        for cell in SplitCell::ALL {
            let path = dir.join(cell.file_name(ratio, modality));
            match load_table(&path) {
                Ok(table) => {
                    log::debug!("{modality} {cell}: {} records", table.len());
                    sources.insert(cell, table);
                }
                Err(DatasetError::MissingFile(path)) => {
                    log::warn!(
                        "{modality} {cell}: {} not found, treating cell as empty",
                        path.display()
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(sources)
    }

    /// Id sets per cell, validating that each source has the `Song` column.
    fn id_sets(&self) -> Result<BTreeMap<SplitCell, HashSet<String>>> {
        let mut sets = BTreeMap::new();
        for (cell, table) in &self.cells {
            table.require_column(SPLIT_SONG)?;
            sets.insert(*cell, table.id_set(SPLIT_SONG));
        }
        Ok(sets)
    }

    /// First quadrant seen for each id across all cells.
    fn quadrants(&self) -> HashMap<String, Value> {
        let mut quadrants = HashMap::new();
        for table in self.cells.values() {
            for row in &table.rows {
                let quadrant = cell(row, QUADRANT);
                if quadrant.is_null() {
                    continue;
                }
                if let Some(id) = id_of(row, SPLIT_SONG) {
                    quadrants.entry(id).or_insert_with(|| quadrant.clone());
                }
            }
        }
        quadrants
    }
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// Build the consolidated split table for a modality.
///
/// One output row per record of `records`, in source order, with columns
/// `<id>, Quadrant, in_balanced_train, …, in_complete_test`. The quadrant is
/// the record's own when present, else the first one the split files give.
/// Cells missing from `sources` produce an all-false column.
pub fn annotate_splits(records: &Table, modality: Modality, sources: &SplitSources) -> Result<Table> {
    let id_column = modality.id_column();
    records.require_column(id_column)?;

    let sets = sources.id_sets()?;
    for split_cell in SplitCell::ALL {
        if !sets.contains_key(&split_cell) {
            log::warn!("{modality}: no assignments for {split_cell}, column will be all False");
        }
    }
    let split_quadrants = sources.quadrants();

    let mut columns = vec![id_column.to_string(), QUADRANT.to_string()];
    columns.extend(SplitCell::ALL.iter().map(|c| c.column_name()));

    let mut skipped = 0usize;
    let mut rows = Vec::with_capacity(records.len());
    for record in &records.rows {
        let Some(id) = id_of(record, id_column) else {
            skipped += 1;
            continue;
        };

        let quadrant = match cell(record, QUADRANT) {
            Value::Null => split_quadrants.get(&id).cloned().unwrap_or(Value::Null),
            q => q.clone(),
        };

        let mut row = Row::new();
        for split_cell in SplitCell::ALL {
            let member = sets.get(&split_cell).is_some_and(|ids| ids.contains(&id));
            row.insert(split_cell.column_name(), Value::Bool(member));
        }
        row.insert(QUADRANT.to_string(), quadrant);
        row.insert(id_column.to_string(), Value::String(id));
        rows.push(row);
    }
    if skipped > 0 {
        log::warn!("{}: skipped {skipped} records with a null {id_column}", records.name);
    }

    let table = Table::from_rows(format!("{modality} splits"), columns, rows);
    for split_cell in SplitCell::ALL {
        log::info!(
            "{modality} {split_cell}: {} records",
            table.count_true(&split_cell.column_name())
        );
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A record flagged in more than one of train/validate/test under one
/// sampling policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapViolation {
    pub id: String,
    pub sampling: Sampling,
    pub splits: Vec<Split>,
}

/// Find records whose train/validate/test membership overlaps. The source data
/// does not guarantee a partition, so this only reports.
pub fn overlap_violations(split_table: &Table, id_column: &str) -> Vec<OverlapViolation> {
    let mut violations = Vec::new();
    for row in &split_table.rows {
        for sampling in Sampling::ALL {
            let splits: Vec<Split> = Split::ALL
                .into_iter()
                .filter(|&split| flag_of(row, &SplitCell::new(sampling, split).column_name()))
                .collect();
            if splits.len() > 1 {
                violations.push(OverlapViolation {
                    id: id_of(row, id_column).unwrap_or_default(),
                    sampling,
                    splits,
                });
            }
        }
    }
    violations
}

/// Ids assigned to a cell that do not exist in the modality's records.
pub fn orphan_ids(
    records: &Table,
    modality: Modality,
    sources: &SplitSources,
) -> Result<BTreeMap<SplitCell, Vec<String>>> {
    let known = records.id_set(modality.id_column());
    let mut orphans = BTreeMap::new();
    for (cell, table) in &sources.cells {
        table.require_column(SPLIT_SONG)?;
        let mut missing: Vec<String> = table
            .rows
            .iter()
            .filter_map(|r| id_of(r, SPLIT_SONG))
            .filter(|id| !known.contains(id))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            orphans.insert(*cell, missing);
        }
    }
    Ok(orphans)
}
