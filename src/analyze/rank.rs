use std::num::NonZeroUsize;

use serde::Serialize;

use crate::analyze::aggregate::{grouped_mean, require_numeric, GroupEntry};
use crate::analyze::{cmp_score_desc, Availability};
use crate::data::model::{Dataset, Row, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Top-K ranking
// ---------------------------------------------------------------------------

/// Top-K ranking of keys by mean score: at most K entries, descending,
/// first-seen key order on ties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub key_field: String,
    pub score_field: String,
    pub entries: Vec<GroupEntry>,
}

/// Rank the keys of `key_field` by mean `score_field` within the rows where
/// `group_field == group_value`, keeping the top `k`.
///
/// Fewer than `k` distinct keys return all of them, no padding. A missing
/// `group_field` or `key_field` answers `Unavailable`; a missing or
/// non-numeric `score_field` is a field error.
pub fn top_k(
    ds: &Dataset,
    group_field: &str,
    group_value: &Value,
    key_field: &str,
    score_field: &str,
    k: NonZeroUsize,
) -> Result<Availability<Ranking>> {
    require_numeric(ds, score_field)?;
    if !ds.has_column(group_field) {
        return Ok(Availability::unavailable(format!(
            "column '{group_field}' is missing from the uploaded table"
        )));
    }
    if !ds.has_column(key_field) {
        return Ok(Availability::unavailable(format!(
            "column '{key_field}' is missing from the uploaded table"
        )));
    }

    let selected = ds.filter_equals(group_field, group_value)?;
    match grouped_mean(&selected, key_field, score_field)? {
        Availability::Available(mut aggregate) => {
            aggregate.entries.truncate(k.get());
            Ok(Availability::Available(Ranking {
                key_field: key_field.to_string(),
                score_field: score_field.to_string(),
                entries: aggregate.entries,
            }))
        }
        Availability::Unavailable { reason } => Ok(Availability::unavailable(reason)),
    }
}

// ---------------------------------------------------------------------------
// Row extremes and full ordering
// ---------------------------------------------------------------------------

/// The single rows carrying the smallest and the largest `score_field`
/// value. Rows without a usable score are skipped; among equal scores the
/// first row in table order wins.
pub fn extremes(ds: &Dataset, score_field: &str) -> Result<(Row, Row)> {
    require_numeric(ds, score_field)?;
    if ds.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut min: Option<(&Row, f64)> = None;
    let mut max: Option<(&Row, f64)> = None;
    for row in ds.rows() {
        let value = &row[score_field];
        if value.is_missing() {
            continue;
        }
        let Some(score) = value.as_f64() else { continue };
        // Strict comparisons keep the earliest row on ties.
        match min {
            Some((_, best)) if score >= best => {}
            _ => min = Some((row, score)),
        }
        match max {
            Some((_, best)) if score <= best => {}
            _ => max = Some((row, score)),
        }
    }

    match (min, max) {
        (Some((lo, _)), Some((hi, _))) => Ok((lo.clone(), hi.clone())),
        // Rows existed, but none carried a score.
        _ => Err(Error::EmptyInput),
    }
}

/// Every row's (`key_field`, `score_field`) pair, sorted descending by
/// score. The sort is stable, so equal scores keep table order and repeated
/// calls yield identical output; rows with a missing score trail the list.
pub fn rank_all(ds: &Dataset, key_field: &str, score_field: &str) -> Result<Vec<(Row, f64)>> {
    if !ds.has_column(key_field) {
        return Err(Error::field(key_field, "not present in the table"));
    }
    require_numeric(ds, score_field)?;

    let mut ranked: Vec<(Row, f64)> = ds
        .rows()
        .iter()
        .map(|row| {
            let score = if row[score_field].is_missing() {
                f64::NAN
            } else {
                row[score_field].as_f64().unwrap_or(f64::NAN)
            };
            let subset: Row = [
                (key_field.to_string(), row[key_field].clone()),
                (score_field.to_string(), row[score_field].clone()),
            ]
            .into_iter()
            .collect();
            (subset, score)
        })
        .collect();
    ranked.sort_by(|a, b| cmp_score_desc(a.1, b.1));
    Ok(ranked)
}
