use std::collections::HashMap;
use std::num::NonZeroUsize;

use serde::Serialize;

use crate::analyze::{cmp_score_desc, Availability};
use crate::data::model::{Dataset, Value, ValueKind};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Grouped mean
// ---------------------------------------------------------------------------

/// Running (sum, count) pair for one group's mean.
///
/// Accumulators merge commutatively and associatively, so a table split into
/// row batches and merged yields bit-identical results to a sequential pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAccumulator {
    sum: f64,
    count: u64,
}

impl MeanAccumulator {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn merge(&mut self, other: MeanAccumulator) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// NaN for a group with no contributing rows.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}

/// One group of a [`GroupedAggregate`]: the category value, the mean of the
/// aggregated field within it, and how many rows contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub key: Value,
    pub mean: f64,
    pub count: u64,
}

/// Mapping from a categorical key to a mean, sorted descending by mean.
/// Ties keep the order in which groups were first encountered; groups whose
/// every value was missing (mean NaN) come last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedAggregate {
    pub group_field: String,
    pub value_field: String,
    pub entries: Vec<GroupEntry>,
}

/// Group rows by `group_field` and average `value_field` within each group.
///
/// Null and NaN values of `value_field` are excluded from both sum and count.
/// Group keys are never dropped: a null genre is its own group. A missing
/// `group_field` column answers `Unavailable`; a missing or non-numeric
/// `value_field` is a caller mistake and fails with a field error.
pub fn grouped_mean(
    ds: &Dataset,
    group_field: &str,
    value_field: &str,
) -> Result<Availability<GroupedAggregate>> {
    require_numeric(ds, value_field)?;
    if !ds.has_column(group_field) {
        return Ok(Availability::unavailable(format!(
            "column '{group_field}' is missing from the uploaded table"
        )));
    }

    let mut index: HashMap<Value, usize> = HashMap::new();
    let mut groups: Vec<(Value, MeanAccumulator)> = Vec::new();

    for row in ds.rows() {
        let key = &row[group_field];
        let slot = match index.get(key) {
            Some(&i) => i,
            None => {
                groups.push((key.clone(), MeanAccumulator::default()));
                index.insert(key.clone(), groups.len() - 1);
                groups.len() - 1
            }
        };
        let value = &row[value_field];
        if !value.is_missing() {
            if let Some(v) = value.as_f64() {
                groups[slot].1.push(v);
            }
        }
    }

    let mut entries: Vec<GroupEntry> = groups
        .into_iter()
        .map(|(key, acc)| GroupEntry {
            key,
            mean: acc.mean(),
            count: acc.count(),
        })
        .collect();
    entries.sort_by(|a, b| cmp_score_desc(a.mean, b.mean));

    Ok(Availability::Available(GroupedAggregate {
        group_field: group_field.to_string(),
        value_field: value_field.to_string(),
        entries,
    }))
}

pub(crate) fn require_numeric(ds: &Dataset, field: &str) -> Result<()> {
    match ds.kind(field) {
        None => Err(Error::field(field, "not present in the table")),
        Some(ValueKind::Numeric) => Ok(()),
        Some(kind) => Err(Error::field(
            field,
            format!("expected a numeric column, found {kind}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Equal-width bin counts for one numeric field: `edges` has one more entry
/// than `counts`, and bin `i` spans `[edges[i], edges[i + 1])` (the last bin
/// is closed on both ends).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub field: String,
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

/// Bin the finite values of a numeric field into `bins` equal-width bins
/// spanning [min, max]. Null and NaN cells are ignored; a field with no
/// usable values answers `Unavailable`, like a field missing outright.
pub fn histogram(
    ds: &Dataset,
    field: &str,
    bins: NonZeroUsize,
) -> Result<Availability<Histogram>> {
    if !ds.has_column(field) {
        return Ok(Availability::unavailable(format!(
            "column '{field}' is missing from the uploaded table"
        )));
    }
    require_numeric(ds, field)?;

    let values: Vec<f64> = ds
        .rows()
        .iter()
        .filter_map(|row| row[field].as_f64())
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return Ok(Availability::unavailable(format!(
            "column '{field}' has no usable values"
        )));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // A constant column still gets a bin: widen the span to unit width.
    let span = if max > min { max - min } else { 1.0 };
    let n_bins = bins.get();
    let width = span / n_bins as f64;

    let edges: Vec<f64> = (0..=n_bins).map(|i| min + width * i as f64).collect();
    let mut counts = vec![0u64; n_bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }

    Ok(Availability::Available(Histogram {
        field: field.to_string(),
        edges,
        counts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;
    use std::collections::BTreeMap;

    fn tracks(rows: &[(&str, Option<f64>)]) -> Dataset {
        let columns = vec!["track_genre".to_string(), "popularity".to_string()];
        let kinds: BTreeMap<String, ValueKind> = [
            ("track_genre".to_string(), ValueKind::Text),
            ("popularity".to_string(), ValueKind::Numeric),
        ]
        .into_iter()
        .collect();
        let rows: Vec<Row> = rows
            .iter()
            .map(|(genre, pop)| {
                [
                    (
                        "track_genre".to_string(),
                        Value::String(genre.to_string()),
                    ),
                    (
                        "popularity".to_string(),
                        pop.map_or(Value::Null, Value::Float),
                    ),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        Dataset::new(columns, kinds, rows)
    }

    fn bins(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn means_are_sorted_descending() {
        let ds = tracks(&[
            ("pop", Some(50.0)),
            ("rock", Some(90.0)),
            ("pop", Some(70.0)),
        ]);
        let agg = grouped_mean(&ds, "track_genre", "popularity")
            .unwrap()
            .available()
            .unwrap();
        assert_eq!(agg.entries.len(), 2);
        assert_eq!(agg.entries[0].key, Value::String("rock".into()));
        assert_eq!(agg.entries[0].mean, 90.0);
        assert_eq!(agg.entries[1].mean, 60.0);
        assert_eq!(agg.entries[1].count, 2);
    }

    #[test]
    fn ties_keep_first_seen_group_order() {
        let ds = tracks(&[
            ("jazz", Some(60.0)),
            ("blues", Some(60.0)),
            ("ambient", Some(60.0)),
        ]);
        let agg = grouped_mean(&ds, "track_genre", "popularity")
            .unwrap()
            .available()
            .unwrap();
        let keys: Vec<String> = agg.entries.iter().map(|e| e.key.to_string()).collect();
        assert_eq!(keys, vec!["jazz", "blues", "ambient"]);
    }

    #[test]
    fn missing_values_leave_sum_and_count() {
        let ds = tracks(&[
            ("pop", Some(50.0)),
            ("pop", None),
            ("pop", Some(f64::NAN)),
            ("pop", Some(70.0)),
        ]);
        let agg = grouped_mean(&ds, "track_genre", "popularity")
            .unwrap()
            .available()
            .unwrap();
        assert_eq!(agg.entries[0].count, 2);
        assert_eq!(agg.entries[0].mean, 60.0);
    }

    #[test]
    fn groups_with_no_values_sort_last_and_survive() {
        let ds = tracks(&[("pop", None), ("rock", Some(10.0))]);
        let agg = grouped_mean(&ds, "track_genre", "popularity")
            .unwrap()
            .available()
            .unwrap();
        assert_eq!(agg.entries[0].key, Value::String("rock".into()));
        assert_eq!(agg.entries[1].key, Value::String("pop".into()));
        assert!(agg.entries[1].mean.is_nan());
    }

    #[test]
    fn mass_is_conserved() {
        let ds = tracks(&[
            ("pop", Some(50.0)),
            ("rock", Some(90.0)),
            ("pop", Some(70.0)),
            ("rock", None),
            ("jazz", Some(10.0)),
        ]);
        let agg = grouped_mean(&ds, "track_genre", "popularity")
            .unwrap()
            .available()
            .unwrap();
        let recovered: f64 = agg
            .entries
            .iter()
            .filter(|e| e.count > 0)
            .map(|e| e.mean * e.count as f64)
            .sum();
        assert!((recovered - 220.0).abs() < 1e-9);
    }

    #[test]
    fn missing_group_column_is_unavailable_not_an_error() {
        let ds = tracks(&[("pop", Some(50.0))]);
        let result = grouped_mean(&ds, "album_name", "popularity").unwrap();
        assert!(!result.is_available());
    }

    #[test]
    fn non_numeric_value_field_is_a_field_error() {
        let ds = tracks(&[("pop", Some(50.0))]);
        assert!(matches!(
            grouped_mean(&ds, "track_genre", "track_genre"),
            Err(Error::Field { .. })
        ));
        assert!(matches!(
            grouped_mean(&ds, "track_genre", "tempo"),
            Err(Error::Field { .. })
        ));
    }

    #[test]
    fn accumulator_merge_matches_sequential() {
        let values = [50.0, 70.0, 90.0, 10.0, 30.0];

        let mut sequential = MeanAccumulator::default();
        for v in values {
            sequential.push(v);
        }

        let mut left = MeanAccumulator::default();
        let mut right = MeanAccumulator::default();
        for v in &values[..2] {
            left.push(*v);
        }
        for v in &values[2..] {
            right.push(*v);
        }
        left.merge(right);

        assert_eq!(left, sequential);
        assert_eq!(left.mean().to_bits(), sequential.mean().to_bits());
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let ds = tracks(&[
            ("pop", Some(0.0)),
            ("pop", Some(5.0)),
            ("pop", Some(9.9)),
            ("pop", Some(10.0)),
            ("pop", None),
        ]);
        let hist = histogram(&ds, "popularity", bins(2))
            .unwrap()
            .available()
            .unwrap();
        assert_eq!(hist.edges.len(), 3);
        assert_eq!(hist.counts, vec![1, 3]);
        // The maximum lands in the last (closed) bin.
        assert_eq!(hist.counts.iter().sum::<u64>(), 4);
    }

    #[test]
    fn histogram_of_constant_column_uses_unit_span() {
        let ds = tracks(&[("pop", Some(5.0)), ("pop", Some(5.0))]);
        let hist = histogram(&ds, "popularity", bins(4))
            .unwrap()
            .available()
            .unwrap();
        assert_eq!(hist.counts.iter().sum::<u64>(), 2);
        assert_eq!(hist.edges[0], 5.0);
    }

    #[test]
    fn histogram_of_missing_column_is_unavailable() {
        let ds = tracks(&[("pop", Some(5.0))]);
        assert!(!histogram(&ds, "tempo", bins(4)).unwrap().is_available());
    }
}
