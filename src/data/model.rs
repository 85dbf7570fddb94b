use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::error::{DatasetError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell in a table column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a metadata CSV carries.
/// Kept in `BTreeMap` / `BTreeSet` downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

static NULL: Value = Value::Null;

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map(Value::String).unwrap_or(Value::Null)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Infer the cell type from raw CSV text.
    ///
    /// A number is only inferred when writing it back reproduces `s`, so
    /// `"007"`, `"+5"`, `"0.100"` and `"1e3"` stay text. `"NaN"` and `"inf"`
    /// stay text too.
    pub fn parse(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        match s {
            "True" | "true" => return Value::Bool(true),
            "False" | "false" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(i) = s.parse::<i64>() {
            if i.to_string() == s {
                return Value::Integer(i);
            }
            return Value::String(s.to_string());
        }
        if s.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = s.parse::<f64>() {
                if f.is_finite() && format!("{f:?}") == s {
                    return Value::Float(f);
                }
            }
        }
        Value::String(s.to_string())
    }

    /// Raw text kept as-is, without type inference. Empty text is null.
    pub fn text(s: &str) -> Value {
        if s.is_empty() {
            Value::Null
        } else {
            Value::String(s.to_string())
        }
    }

    /// Text written to a CSV field. Booleans use the `True`/`False` literals
    /// downstream consumers expect, nulls are empty fields.
    pub fn to_field(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(v) => format!("{v:?}"),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Null => String::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret the cell as an identifier. Nulls and blank strings are absent.
    pub fn as_id(&self) -> Option<String> {
        match self {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(v) if v.fract() == 0.0 => Some(format!("{}", *v as i64)),
            Value::Float(v) => Some(v.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null => None,
        }
    }

    /// Interpret the cell as a membership flag. Accepts `0`/`1` encodings
    /// written by older tooling.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(v) => Some(*v != 0.0),
            _ => None,
        }
    }

    /// Try to interpret the value as an `f64` for histograms.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Row / Table
// ---------------------------------------------------------------------------

/// One record: column_name → value. Absent keys read as null.
pub type Row = BTreeMap<String, Value>;

/// Read a cell from a row, treating a missing column as null.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

/// Read an identifier cell from a row.
pub fn id_of(row: &Row, column: &str) -> Option<String> {
    cell(row, column).as_id()
}

/// Read a flag cell from a row; missing or non-boolean cells are `false`.
pub fn flag_of(row: &Row, column: &str) -> bool {
    cell(row, column).as_bool().unwrap_or(false)
}

/// An in-memory table with an ordered header.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Label used in diagnostics (usually the source file name).
    pub name: String,
    /// Ordered column names; the CSV header on write.
    pub columns: Vec<String>,
    /// All records, in source order.
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Table {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Table {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with [`DatasetError::MissingColumn`] unless `column` is in the header.
    pub fn require_column(&self, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DatasetError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
        }
    }

    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.rows.get(row).map(|r| cell(r, column)).unwrap_or(&NULL)
    }

    /// Set of non-null identifiers found in `column`.
    pub fn id_set(&self, column: &str) -> HashSet<String> {
        self.rows.iter().filter_map(|r| id_of(r, column)).collect()
    }

    /// Replace `column` with `values`, appending it to the header if new.
    /// `values` shorter than the table leave the remaining rows null.
    pub fn set_column(&mut self, column: &str, values: Vec<Value>) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        let mut values = values.into_iter();
        for row in &mut self.rows {
            let v = values.next().unwrap_or(Value::Null);
            row.insert(column.to_string(), v);
        }
    }

    /// Number of rows whose `column` reads as `true`.
    pub fn count_true(&self, column: &str) -> usize {
        self.rows.iter().filter(|r| flag_of(r, column)).count()
    }

    /// Sorted set of unique values in `column`.
    pub fn unique_values(&self, column: &str) -> BTreeSet<Value> {
        self.rows.iter().map(|r| cell(r, column).clone()).collect()
    }
}
