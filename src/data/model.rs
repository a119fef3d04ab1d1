use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Value – a single cell in a track table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a CSV upload can carry.
/// Using `BTreeMap` / `BTreeSet` downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

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
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64` for aggregation and correlation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// A cell that contributes nothing to a mean: `Null`, or a float NaN.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Schema kinds and raw (pre-normalization) tables
// ---------------------------------------------------------------------------

/// Schema-level type of a column. Integer and floating-point storage both
/// count as `Numeric`; only `Numeric` columns enter the correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Numeric,
    Text,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Numeric => write!(f, "numeric"),
            ValueKind::Text => write!(f, "text"),
            ValueKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// One named column as produced by an ingestion adapter: a homogeneous
/// storage kind and one value per row (`Value::Null` for empty cells).
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub name: String,
    pub kind: ValueKind,
    pub values: Vec<Value>,
}

/// An ingested table before schema normalization: ordered named columns,
/// all of the same length.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }
}

// ---------------------------------------------------------------------------
// Row / Dataset – the normalized in-memory table
// ---------------------------------------------------------------------------

/// One track record: canonical field name → value. Every row of a dataset
/// carries the same key set; absent cells hold `Value::Null`.
pub type Row = BTreeMap<String, Value>;

/// The canonical table all queries operate against, with indices computed
/// once at construction: column order, per-column kind, per-column unique
/// value sets (feeds the genre/artist/album selectors), and the numeric
/// column list (feeds the correlation matrix).
///
/// A `Dataset` is immutable after construction; every derived computation
/// returns a fresh result object, so shared references can be queried from
/// multiple threads without synchronization.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<Row>,
    column_names: Vec<String>,
    kinds: BTreeMap<String, ValueKind>,
    unique_values: BTreeMap<String, BTreeSet<Value>>,
    numeric_columns: Vec<String>,
}

impl Dataset {
    /// Build a dataset and its indices. Callers (the schema normalizer and
    /// the sub-dataset operations below) guarantee that every row holds
    /// exactly the keys in `column_names`.
    pub(crate) fn new(
        column_names: Vec<String>,
        kinds: BTreeMap<String, ValueKind>,
        rows: Vec<Row>,
    ) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = column_names
            .iter()
            .map(|c| (c.clone(), BTreeSet::new()))
            .collect();
        for row in &rows {
            for (col, val) in row {
                if let Some(set) = unique_values.get_mut(col) {
                    set.insert(val.clone());
                }
            }
        }
        let numeric_columns: Vec<String> = column_names
            .iter()
            .filter(|c| kinds.get(*c) == Some(&ValueKind::Numeric))
            .cloned()
            .collect();
        Dataset {
            rows,
            column_names,
            kinds,
            unique_values,
            numeric_columns,
        }
    }

    /// Ordered column names of the canonical schema.
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    /// All rows, in upload order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.kinds.contains_key(field)
    }

    /// Schema kind of a column, if present.
    pub fn kind(&self, field: &str) -> Option<ValueKind> {
        self.kinds.get(field).copied()
    }

    /// Sorted set of distinct values seen in a column, if present.
    pub fn unique_values(&self, field: &str) -> Option<&BTreeSet<Value>> {
        self.unique_values.get(field)
    }

    /// Columns eligible for correlation, in schema order. Computed once at
    /// construction; pure function of the schema.
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Restrict the table to the requested columns, in the requested order.
    /// Row order and row count are preserved.
    pub fn project(&self, fields: &[&str]) -> Result<Dataset> {
        for field in fields {
            if !self.has_column(field) {
                return Err(Error::field(*field, "not present in the table"));
            }
        }
        let column_names: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let kinds: BTreeMap<String, ValueKind> = column_names
            .iter()
            .map(|c| (c.clone(), self.kinds[c]))
            .collect();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| {
                column_names
                    .iter()
                    .map(|c| (c.clone(), row[c].clone()))
                    .collect()
            })
            .collect();
        Ok(Dataset::new(column_names, kinds, rows))
    }

    /// Sub-dataset of rows where `field` equals `value` exactly. No coercion
    /// across kinds: `Integer(5)` never matches `Float(5.0)` or `"5"`.
    pub fn filter_equals(&self, field: &str, value: &Value) -> Result<Dataset> {
        if !self.has_column(field) {
            return Err(Error::field(field, "not present in the table"));
        }
        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| row.get(field) == Some(value))
            .cloned()
            .collect();
        Ok(Dataset::new(
            self.column_names.clone(),
            self.kinds.clone(),
            rows,
        ))
    }
}
