use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use crate::data::model::{RawColumn, RawTable, Value, ValueKind};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raw track table from a file.  Dispatch by extension.
///
/// This is the ingestion edge of the crate: it only produces named columns
/// with one homogeneous kind each.  Schema normalization and every analytic
/// step happen downstream, on the [`RawTable`] this returns.
///
/// Supported formats:
/// * `.csv`     – header row, one track per record (the dashboard's upload format)
/// * `.json`    – records orientation: `[{ "artists": "...", ... }, ...]`
/// * `.parquet` – flat table; column kinds come straight from the storage types
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    info!(
        "loaded {} rows x {} columns from {}",
        table.n_rows(),
        table.n_columns(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: a header row with column names, one track per record.
/// Cell types are not declared, so each column's kind is inferred from the
/// whole column: all-integer, all-float, all-boolean, else text.  Empty
/// cells become nulls and do not influence the inference.
fn load_csv(path: &Path) -> Result<RawTable> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    parse_csv(reader)
}

fn parse_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<RawTable> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: has {} fields, header has {}",
                record.len(),
                headers.len()
            );
        }
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(value.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, col)| infer_text_column(name, col))
        .collect();
    Ok(RawTable { columns })
}

/// Turn one column of raw CSV text into a typed column.  The narrowest kind
/// that fits every non-empty cell wins: integer, then float, then boolean,
/// then text.
fn infer_text_column(name: String, cells: Vec<String>) -> RawColumn {
    if cells.iter().all(|c| c.is_empty()) {
        // Nothing to infer from; an all-null column cannot claim to be numeric.
        return RawColumn {
            name,
            kind: ValueKind::Text,
            values: vec![Value::Null; cells.len()],
        };
    }
    let filled = || cells.iter().filter(|c| !c.is_empty());

    let (kind, values) = if filled().all(|c| c.parse::<i64>().is_ok()) {
        (
            ValueKind::Numeric,
            map_filled(&cells, |c| Value::Integer(c.parse().unwrap())),
        )
    } else if filled().all(|c| c.parse::<f64>().is_ok()) {
        (
            ValueKind::Numeric,
            map_filled(&cells, |c| Value::Float(c.parse().unwrap())),
        )
    } else if filled().all(|c| is_bool_token(c)) {
        (
            ValueKind::Boolean,
            map_filled(&cells, |c| Value::Bool(c.eq_ignore_ascii_case("true"))),
        )
    } else {
        (
            ValueKind::Text,
            map_filled(&cells, |c| Value::String(c.to_string())),
        )
    };

    RawColumn { name, kind, values }
}

fn map_filled(cells: &[String], f: impl Fn(&str) -> Value) -> Vec<Value> {
    cells
        .iter()
        .map(|c| if c.is_empty() { Value::Null } else { f(c) })
        .collect()
}

/// pandas serializes booleans as `True` / `False`, hand-written files use
/// lowercase; accept both.
fn is_bool_token(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "artists": "A", "track_name": "x", "popularity": 51 },
///   ...
/// ]
/// ```
///
/// Keys appear in first-seen order; records missing a key get a null cell.
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut order: Vec<String> = Vec::new();
    let mut values: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for (key, val) in obj {
            if !values.contains_key(key) {
                order.push(key.clone());
                // Back-fill rows seen before this key existed.
                values.insert(key.clone(), vec![Value::Null; i]);
            }
            values.get_mut(key).unwrap().push(json_to_value(val));
        }
        // Null cell for every known key the record left out.
        for (key, column) in values.iter_mut() {
            if obj.get(key).is_none() {
                column.push(Value::Null);
            }
        }
    }

    let columns = order
        .into_iter()
        .map(|name| {
            let column = values.remove(&name).unwrap();
            coerce_homogeneous(name, column)
        })
        .collect();
    Ok(RawTable { columns })
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// JSON columns can mix value types between records; a column must leave the
/// loader with one kind.  Integer and float mix into numeric; anything else
/// mixed degrades every non-null cell to text.
fn coerce_homogeneous(name: String, values: Vec<Value>) -> RawColumn {
    let mut numeric = 0usize;
    let mut boolean = 0usize;
    let mut text = 0usize;
    let mut filled = 0usize;
    for v in &values {
        match v {
            Value::Integer(_) | Value::Float(_) => numeric += 1,
            Value::Bool(_) => boolean += 1,
            Value::String(_) => text += 1,
            Value::Null => continue,
        }
        filled += 1;
    }

    let kind = if filled == 0 || text == filled {
        ValueKind::Text
    } else if numeric == filled {
        ValueKind::Numeric
    } else if boolean == filled {
        ValueKind::Boolean
    } else {
        ValueKind::Text
    };

    let values = if kind == ValueKind::Text && text != filled {
        values
            .into_iter()
            .map(|v| match v {
                Value::Null => Value::Null,
                other => Value::String(other.to_string()),
            })
            .collect()
    } else {
        values
    };

    RawColumn { name, kind, values }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing a flat track table.
///
/// Column kinds come directly from the Arrow storage types: integer and
/// floating-point columns are numeric, `Boolean` is boolean, everything else
/// is read back as text.  Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<RawColumn> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if columns.is_empty() {
            columns = schema
                .fields()
                .iter()
                .map(|f| RawColumn {
                    name: f.name().clone(),
                    kind: kind_of_arrow(f.data_type()),
                    values: Vec::new(),
                })
                .collect();
        } else if columns.len() != schema.fields().len() {
            bail!("parquet batches disagree on column count");
        }

        for (col_idx, column) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                column.values.push(extract_value(array, row));
            }
        }
    }

    Ok(RawTable { columns })
}

// -- Parquet / Arrow helpers --

fn kind_of_arrow(data_type: &DataType) -> ValueKind {
    match data_type {
        DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64 => {
            ValueKind::Numeric
        }
        DataType::Boolean => ValueKind::Boolean,
        _ => ValueKind::Text,
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                Value::String(s.value(row).to_string())
            } else {
                // LargeStringArray
                let s = col.as_string::<i64>();
                Value::String(s.value(row).to_string())
            }
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            Value::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            Value::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            Value::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            Value::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            Value::Bool(arr.value(row))
        }
        _ => Value::String(format!("{:?}", col.data_type())),
    }
}
