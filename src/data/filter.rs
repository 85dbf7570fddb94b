use std::collections::{BTreeMap, BTreeSet};

use super::model::{Row, Table, Value, cell, flag_of};

// ---------------------------------------------------------------------------
// Value selection: which unique values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// If a column is absent it means "no filter" (show all).
pub type FilterState = BTreeMap<String, BTreeSet<Value>>;

/// Initialise a [`FilterState`] for `columns` with all values selected.
pub fn init_filter_state(table: &Table, columns: &[&str]) -> FilterState {
    columns
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| (c.to_string(), table.unique_values(c)))
        .collect()
}

fn passes_selection(row: &Row, filters: &FilterState) -> bool {
    filters.iter().all(|(col, selected)| {
        // Nothing selected for this column → hide everything
        !selected.is_empty() && selected.contains(cell(row, col))
    })
}

// ---------------------------------------------------------------------------
// Row predicates
// ---------------------------------------------------------------------------

/// A row-level condition over named columns. A missing column reads as null,
/// so flag predicates on it never match.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Column value is one of the given values.
    OneOf(String, BTreeSet<Value>),
    /// Column reads as `true`.
    IsTrue(String),
    /// Column is not null.
    NotNull(String),
    /// Column is null.
    IsNull(String),
    /// At least one of the columns reads as `true`.
    AnyTrue(Vec<String>),
    /// At least one of the columns is not null.
    AnyNotNull(Vec<String>),
}

impl Predicate {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Predicate::OneOf(col, values) => values.contains(cell(row, col)),
            Predicate::IsTrue(col) => flag_of(row, col),
            Predicate::NotNull(col) => !cell(row, col).is_null(),
            Predicate::IsNull(col) => cell(row, col).is_null(),
            Predicate::AnyTrue(cols) => cols.iter().any(|c| flag_of(row, c)),
            Predicate::AnyNotNull(cols) => cols.iter().any(|c| !cell(row, c).is_null()),
        }
    }
}

/// Return indices of rows that pass all active value selections and predicates.
///
/// A row passes a column selection when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The selected set for that column is empty → nothing selected → fails
/// * The row's value for that column is in the selected set → passes
pub fn filtered_indices(table: &Table, filters: &FilterState, predicates: &[Predicate]) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| passes_selection(row, filters) && predicates.iter().all(|p| p.matches(row)))
        .map(|(i, _)| i)
        .collect()
}

/// Count occurrences of each value of `column` over the given rows.
pub fn value_counts(table: &Table, indices: &[usize], column: &str) -> BTreeMap<Value, usize> {
    let mut counts = BTreeMap::new();
    for &i in indices {
        *counts.entry(table.value(i, column).clone()).or_insert(0) += 1;
    }
    counts
}
