use std::collections::BTreeSet;
use std::path::Path;

use crate::data::columns::{AROUSAL, BALANCED_COLUMNS, LYRIC_ID, QUADRANT, SONG_ID, VALENCE};
use crate::data::filter::{FilterState, Predicate, filtered_indices, init_filter_state, value_counts};
use crate::data::identity::Modality;
use crate::data::loader::load_table;
use crate::data::model::{Table, Value, cell};
use crate::splits::{Sampling, Split, SplitCell};
use crate::unify::KindCounts;

/// Number of bins in the arousal/valence histograms.
pub const HISTOGRAM_BINS: usize = 30;

// ---------------------------------------------------------------------------
// Filter selectors
// ---------------------------------------------------------------------------

/// What kind of produced table is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Per-modality split table with `in_<sampling>_<split>` columns.
    Split,
    /// Unified table.
    Unified,
}

impl TableKind {
    /// A table carrying any split column is a split table.
    pub fn detect(table: &Table) -> TableKind {
        if SplitCell::ALL.iter().any(|c| table.has_column(&c.column_name())) {
            TableKind::Split
        } else {
            TableKind::Unified
        }
    }
}

/// Split selector for split tables. `All` is the union of the three splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitFilter {
    One(Split),
    All,
}

/// Sampling selector for the unified table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingFilter {
    All,
    Complete,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalityFilter {
    All,
    Only(Modality),
}

fn balanced_column(modality: Modality) -> String {
    format!("in_{}_balanced", modality.as_str())
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Equal-width histogram over `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// None when `values` is empty.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Histogram> {
        if values.is_empty() || bins == 0 {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (max - min) / bins as f64;

        let mut counts = vec![0; bins];
        for &v in values {
            let bin = if width > 0.0 {
                (((v - min) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[bin] += 1;
        }
        Some(Histogram { min, max, counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Quadrant count over the whole table and over the visible rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadrantComparison {
    pub quadrant: Value,
    pub total: usize,
    pub visible: usize,
    /// `visible / total` as a percentage, one decimal.
    pub percent_kept: f64,
}

/// Split membership counts for one sampling policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDistribution {
    pub sampling: Sampling,
    pub counts: Vec<(Split, usize)>,
    /// Rows in any of the three splits; None unless all three columns exist.
    pub union: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total: usize,
    pub visible: usize,
    pub quadrants: Vec<QuadrantComparison>,
    /// Per-kind counts, unified tables only.
    pub modalities: Option<KindCounts>,
    pub balanced: Vec<(String, usize)>,
    pub splits: Vec<SplitDistribution>,
    /// Null count per column, columns without nulls left out.
    pub missing_values: Vec<(String, usize)>,
    pub arousal: Option<Histogram>,
    pub valence: Option<Histogram>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Dashboard state, independent of rendering.
pub struct DashboardState {
    /// Loaded table (None until a file is opened).
    pub table: Option<Table>,

    pub kind: TableKind,

    /// Quadrant multi-select.
    pub filters: FilterState,

    /// Split-table selectors.
    pub split_sampling: Sampling,
    pub split: SplitFilter,

    /// Unified-table selectors.
    pub sampling: SamplingFilter,
    pub modality: ModalityFilter,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Status / warning message for the consumer to show.
    pub status_message: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            table: None,
            kind: TableKind::Unified,
            filters: FilterState::default(),
            split_sampling: Sampling::Complete,
            split: SplitFilter::All,
            sampling: SamplingFilter::All,
            modality: ModalityFilter::All,
            visible_indices: Vec::new(),
            status_message: None,
        }
    }
}

impl DashboardState {
    /// Load a produced table from disk. On failure the previous table stays
    /// and the error goes to `status_message`.
    pub fn open(&mut self, path: &Path) {
        match load_table(path) {
            Ok(table) => self.set_table(table),
            Err(e) => {
                log::error!("{e}");
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Ingest a table, select every quadrant and reset the selectors.
    pub fn set_table(&mut self, table: Table) {
        self.kind = TableKind::detect(&table);
        self.filters = init_filter_state(&table, &[QUADRANT]);
        self.split_sampling = Sampling::Complete;
        self.split = SplitFilter::All;
        self.sampling = SamplingFilter::All;
        self.modality = ModalityFilter::All;
        self.status_message = if table.has_column(QUADRANT) {
            None
        } else {
            Some(format!("column '{QUADRANT}' not found"))
        };
        self.table = Some(table);
        self.refilter();
    }

    /// Row predicates implied by the current selectors. Selectors naming a
    /// missing column add a status warning instead of a predicate.
    pub fn predicates(&mut self) -> Vec<Predicate> {
        let Some(table) = &self.table else {
            return Vec::new();
        };
        let (predicates, warning) = match self.kind {
            TableKind::Split => split_predicates(table, self.split_sampling, self.split),
            TableKind::Unified => unified_predicates(table, self.sampling, self.modality),
        };
        if let Some(warning) = warning {
            log::warn!("{warning}");
            self.status_message = Some(warning);
        }
        predicates
    }

    /// Recompute `visible_indices` after a selector change.
    pub fn refilter(&mut self) {
        let predicates = self.predicates();
        if let Some(table) = &self.table {
            self.visible_indices = filtered_indices(table, &self.filters, &predicates);
        }
    }

    pub fn set_split_filter(&mut self, sampling: Sampling, split: SplitFilter) {
        self.split_sampling = sampling;
        self.split = split;
        self.refilter();
    }

    pub fn set_unified_filter(&mut self, sampling: SamplingFilter, modality: ModalityFilter) {
        self.sampling = sampling;
        self.modality = modality;
        self.refilter();
    }

    /// Toggle a single quadrant in the multi-select.
    pub fn toggle_quadrant(&mut self, quadrant: &Value) {
        let selected = self.filters.entry(QUADRANT.to_string()).or_default();
        if selected.contains(quadrant) {
            selected.remove(quadrant);
        } else {
            selected.insert(quadrant.clone());
        }
        self.refilter();
    }

    pub fn select_all_quadrants(&mut self) {
        if let Some(table) = &self.table {
            if table.has_column(QUADRANT) {
                self.filters.insert(QUADRANT.to_string(), table.unique_values(QUADRANT));
                self.refilter();
            }
        }
    }

    pub fn select_no_quadrants(&mut self) {
        self.filters.insert(QUADRANT.to_string(), BTreeSet::new());
        self.refilter();
    }

    /// Aggregates over the loaded table and the visible rows.
    pub fn summary(&self) -> Option<DashboardSummary> {
        let table = self.table.as_ref()?;
        let all: Vec<usize> = (0..table.len()).collect();
        let visible = &self.visible_indices;

        let quadrants = if table.has_column(QUADRANT) {
            let before = value_counts(table, &all, QUADRANT);
            let after = value_counts(table, visible, QUADRANT);
            before
                .into_iter()
                .map(|(quadrant, total)| {
                    let kept = after.get(&quadrant).copied().unwrap_or(0);
                    QuadrantComparison {
                        percent_kept: (kept as f64 / total as f64 * 1000.0).round() / 10.0,
                        quadrant,
                        total,
                        visible: kept,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        let modalities = (self.kind == TableKind::Unified
            && table.has_column(SONG_ID)
            && table.has_column(LYRIC_ID))
        .then(|| KindCounts::of(table));

        let balanced = BALANCED_COLUMNS
            .iter()
            .filter(|c| table.has_column(c))
            .map(|c| (c.to_string(), table.count_true(c)))
            .collect();

        let splits = Sampling::ALL
            .into_iter()
            .map(|sampling| split_distribution(table, sampling))
            .filter(|d| !d.counts.is_empty())
            .collect();

        let missing_values = table
            .columns
            .iter()
            .map(|c| (c.clone(), table.rows.iter().filter(|r| cell(r, c).is_null()).count()))
            .filter(|(_, n)| *n > 0)
            .collect();

        Some(DashboardSummary {
            total: table.len(),
            visible: visible.len(),
            quadrants,
            modalities,
            balanced,
            splits,
            missing_values,
            arousal: histogram(table, visible, AROUSAL),
            valence: histogram(table, visible, VALENCE),
        })
    }
}

fn split_predicates(table: &Table, sampling: Sampling, split: SplitFilter) -> (Vec<Predicate>, Option<String>) {
    match split {
        SplitFilter::One(split) => {
            let column = SplitCell::new(sampling, split).column_name();
            if table.has_column(&column) {
                (vec![Predicate::IsTrue(column)], None)
            } else {
                (Vec::new(), Some(format!("column '{column}' not found")))
            }
        }
        SplitFilter::All => {
            let columns: Vec<String> = Split::ALL
                .into_iter()
                .map(|s| SplitCell::new(sampling, s).column_name())
                .filter(|c| table.has_column(c))
                .collect();
            if columns.is_empty() {
                (Vec::new(), Some(format!("no {} split columns found", sampling.as_str())))
            } else {
                (vec![Predicate::AnyTrue(columns)], None)
            }
        }
    }
}

fn unified_predicates(
    table: &Table,
    sampling: SamplingFilter,
    modality: ModalityFilter,
) -> (Vec<Predicate>, Option<String>) {
    match (sampling, modality) {
        (SamplingFilter::All, ModalityFilter::All) => (Vec::new(), None),
        (SamplingFilter::Balanced, ModalityFilter::Only(m)) => {
            let column = balanced_column(m);
            if table.has_column(&column) {
                (vec![Predicate::IsTrue(column)], None)
            } else {
                (Vec::new(), Some(format!("column '{column}' not found")))
            }
        }
        (_, ModalityFilter::Only(m)) => (presence_predicates(m), None),
        (SamplingFilter::Balanced, ModalityFilter::All) => {
            let columns: Vec<String> = BALANCED_COLUMNS
                .iter()
                .filter(|c| table.has_column(c))
                .map(|c| c.to_string())
                .collect();
            if columns.is_empty() {
                (Vec::new(), Some("no balanced columns found".to_string()))
            } else {
                (vec![Predicate::AnyTrue(columns)], None)
            }
        }
        (SamplingFilter::Complete, ModalityFilter::All) => (
            vec![Predicate::AnyNotNull(vec![SONG_ID.to_string(), LYRIC_ID.to_string()])],
            None,
        ),
    }
}

/// Id-presence predicates for a modality on the unified table.
fn presence_predicates(modality: Modality) -> Vec<Predicate> {
    match modality {
        Modality::Audio => vec![Predicate::NotNull(SONG_ID.to_string())],
        Modality::Lyrics => vec![Predicate::NotNull(LYRIC_ID.to_string())],
        Modality::Bimodal => vec![
            Predicate::NotNull(SONG_ID.to_string()),
            Predicate::NotNull(LYRIC_ID.to_string()),
        ],
    }
}

fn split_distribution(table: &Table, sampling: Sampling) -> SplitDistribution {
    let columns: Vec<(Split, String)> = Split::ALL
        .into_iter()
        .map(|s| (s, SplitCell::new(sampling, s).column_name()))
        .filter(|(_, c)| table.has_column(c))
        .collect();
    let counts = columns.iter().map(|(s, c)| (*s, table.count_true(c))).collect();

    let union = (columns.len() == Split::ALL.len()).then(|| {
        let any = Predicate::AnyTrue(columns.into_iter().map(|(_, c)| c).collect());
        table.rows.iter().filter(|r| any.matches(r)).count()
    });
    SplitDistribution { sampling, counts, union }
}

fn histogram(table: &Table, indices: &[usize], column: &str) -> Option<Histogram> {
    if !table.has_column(column) {
        return None;
    }
    let values: Vec<f64> = indices.iter().filter_map(|&i| table.value(i, column).as_f64()).collect();
    Histogram::from_values(&values, HISTOGRAM_BINS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::columns::{IN_AUDIO_BALANCED, IN_BIMODAL_BALANCED, IN_LYRICS_BALANCED};
    use crate::data::model::Row;

    fn make_unified() -> Table {
        // (Song_id, Lyric_id, Quadrant, Arousal, audio_bal, lyrics_bal, bimodal_bal)
        let records = [
            (Some("A1"), Some("L1"), "Q1", 0.9, true, true, true),
            (Some("A2"), Some("L2"), "Q2", 0.1, false, false, false),
            (Some("A3"), None, "Q1", 0.6, true, false, false),
            (Some("A4"), None, "Q3", 0.2, false, false, false),
            (None, Some("L5"), "Q4", 0.7, false, true, false),
        ];
        let rows = records
            .iter()
            .map(|&(song, lyric, q, a, ab, lb, bb)| {
                let mut r = Row::new();
                r.insert(SONG_ID.into(), song.map(Value::from).unwrap_or(Value::Null));
                r.insert(LYRIC_ID.into(), lyric.map(Value::from).unwrap_or(Value::Null));
                r.insert(QUADRANT.into(), Value::from(q));
                r.insert(AROUSAL.into(), Value::Float(a));
                r.insert(IN_AUDIO_BALANCED.into(), Value::Bool(ab));
                r.insert(IN_LYRICS_BALANCED.into(), Value::Bool(lb));
                r.insert(IN_BIMODAL_BALANCED.into(), Value::Bool(bb));
                r
            })
            .collect();
        let columns = [SONG_ID, LYRIC_ID, QUADRANT, AROUSAL, IN_AUDIO_BALANCED, IN_LYRICS_BALANCED, IN_BIMODAL_BALANCED]
            .iter()
            .map(|c| c.to_string())
            .collect();
        Table::from_rows("merge_unified.csv", columns, rows)
    }

    fn make_split_table() -> Table {
        let flags = [
            ("A1", "Q1", [true, false, false]),
            ("A2", "Q2", [false, true, false]),
            ("A3", "Q1", [false, false, false]),
        ];
        let rows = flags
            .iter()
            .map(|(id, q, complete)| {
                let mut r = Row::new();
                r.insert(SONG_ID.into(), Value::from(*id));
                r.insert(QUADRANT.into(), Value::from(*q));
                for (split, flag) in Split::ALL.into_iter().zip(complete) {
                    r.insert(SplitCell::new(Sampling::Complete, split).column_name(), Value::Bool(*flag));
                }
                r
            })
            .collect();
        let mut columns = vec![SONG_ID.to_string(), QUADRANT.to_string()];
        columns.extend(Split::ALL.map(|s| SplitCell::new(Sampling::Complete, s).column_name()));
        Table::from_rows("tvt_40_30_30.csv", columns, rows)
    }

    fn loaded(table: Table) -> DashboardState {
        let mut state = DashboardState::default();
        state.set_table(table);
        state
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(TableKind::detect(&make_unified()), TableKind::Unified);
        assert_eq!(TableKind::detect(&make_split_table()), TableKind::Split);
    }

    #[test]
    fn test_unified_filters() {
        let mut state = loaded(make_unified());
        assert_eq!(state.visible_indices, vec![0, 1, 2, 3, 4]);

        state.set_unified_filter(SamplingFilter::Complete, ModalityFilter::Only(Modality::Audio));
        assert_eq!(state.visible_indices, vec![0, 1, 2, 3]);

        state.set_unified_filter(SamplingFilter::All, ModalityFilter::Only(Modality::Bimodal));
        assert_eq!(state.visible_indices, vec![0, 1]);

        state.set_unified_filter(SamplingFilter::Balanced, ModalityFilter::Only(Modality::Audio));
        assert_eq!(state.visible_indices, vec![0, 2]);

        state.set_unified_filter(SamplingFilter::Balanced, ModalityFilter::All);
        assert_eq!(state.visible_indices, vec![0, 2, 4]);
    }

    #[test]
    fn test_missing_balanced_column_warns_without_filtering() {
        let mut table = make_unified();
        table.columns.retain(|c| c != IN_LYRICS_BALANCED);
        for row in &mut table.rows {
            row.remove(IN_LYRICS_BALANCED);
        }
        let mut state = loaded(table);
        state.set_unified_filter(SamplingFilter::Balanced, ModalityFilter::Only(Modality::Lyrics));
        assert_eq!(state.visible_indices.len(), 5);
        assert!(state.status_message.as_deref().unwrap_or_default().contains(IN_LYRICS_BALANCED));
    }

    #[test]
    fn test_balanced_without_balanced_columns_warns() {
        let strip = |keep: &[&str]| {
            let mut table = make_unified();
            let dropped: Vec<&str> = BALANCED_COLUMNS.iter().copied().filter(|c| !keep.contains(c)).collect();
            table.columns.retain(|c| !dropped.contains(&c.as_str()));
            for row in &mut table.rows {
                row.retain(|k, _| !dropped.contains(&k.as_str()));
            }
            table
        };

        let mut state = loaded(strip(&[]));
        state.set_unified_filter(SamplingFilter::Balanced, ModalityFilter::All);
        assert_eq!(state.visible_indices.len(), 5);
        assert_eq!(state.status_message.as_deref(), Some("no balanced columns found"));

        // the columns still present decide
        let mut state = loaded(strip(&[IN_AUDIO_BALANCED]));
        state.set_unified_filter(SamplingFilter::Balanced, ModalityFilter::All);
        assert_eq!(state.visible_indices, vec![0, 2]);
    }

    #[test]
    fn test_split_filters_and_quadrants() {
        let mut state = loaded(make_split_table());
        // complete, all splits
        assert_eq!(state.visible_indices, vec![0, 1]);

        state.set_split_filter(Sampling::Complete, SplitFilter::One(Split::Validate));
        assert_eq!(state.visible_indices, vec![1]);

        state.set_split_filter(Sampling::Complete, SplitFilter::All);
        state.toggle_quadrant(&Value::from("Q2"));
        assert_eq!(state.visible_indices, vec![0]);

        state.select_no_quadrants();
        assert!(state.visible_indices.is_empty());
        state.select_all_quadrants();
        assert_eq!(state.visible_indices, vec![0, 1]);

        state.set_split_filter(Sampling::Balanced, SplitFilter::One(Split::Train));
        assert_eq!(state.visible_indices, vec![0, 1, 2]);
        assert!(state.status_message.is_some());
    }

    #[test]
    fn test_summary() {
        let mut state = loaded(make_unified());
        state.set_unified_filter(SamplingFilter::Complete, ModalityFilter::Only(Modality::Audio));
        let summary = state.summary().unwrap();

        assert_eq!((summary.total, summary.visible), (5, 4));
        let q1 = &summary.quadrants[0];
        assert_eq!((q1.total, q1.visible, q1.percent_kept), (2, 2, 100.0));
        let q4 = summary.quadrants.iter().find(|q| q.quadrant == Value::from("Q4")).unwrap();
        assert_eq!(q4.percent_kept, 0.0);

        let kinds = summary.modalities.unwrap();
        assert_eq!((kinds.bimodal, kinds.audio_only, kinds.lyrics_only), (2, 2, 1));
        assert_eq!(summary.balanced[0], (IN_AUDIO_BALANCED.to_string(), 2));
        assert!(summary.splits.is_empty());
        assert_eq!(
            summary.missing_values,
            vec![(SONG_ID.to_string(), 1), (LYRIC_ID.to_string(), 2)]
        );

        let arousal = summary.arousal.unwrap();
        assert_eq!(arousal.counts.len(), HISTOGRAM_BINS);
        assert_eq!(arousal.total(), 4);
        assert_eq!((arousal.min, arousal.max), (0.1, 0.9));
        assert_eq!(arousal.counts[HISTOGRAM_BINS - 1], 1);
        assert!(summary.valence.is_none() && !state.table.as_ref().unwrap().has_column(VALENCE));
    }

    #[test]
    fn test_split_distribution_union() {
        let state = loaded(make_split_table());
        let summary = state.summary().unwrap();
        assert_eq!(summary.splits.len(), 1);
        let complete = &summary.splits[0];
        assert_eq!(complete.sampling, Sampling::Complete);
        assert_eq!(complete.counts, vec![(Split::Train, 1), (Split::Validate, 1), (Split::Test, 0)]);
        assert_eq!(complete.union, Some(2));
        assert!(summary.modalities.is_none());
    }

    #[test]
    fn test_histogram_constant_values() {
        let h = Histogram::from_values(&[0.5, 0.5], 30).unwrap();
        assert_eq!(h.counts[0], 2);
        assert!(Histogram::from_values(&[], 30).is_none());
    }

    #[test]
    fn test_open_missing_file_sets_status() {
        let mut state = DashboardState::default();
        state.open(Path::new("/nonexistent/merge_unified.csv"));
        assert!(state.table.is_none());
        assert!(state.status_message.is_some());
    }
}
