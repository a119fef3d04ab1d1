//! Analytics layer: grouped aggregation, correlation, and ranking over an
//! immutable [`Dataset`](crate::data::model::Dataset).
//!
//! Every function here is a pure computation: it borrows the dataset,
//! allocates a fresh result object, and touches no shared state.

pub mod aggregate;
pub mod correlate;
pub mod rank;

use std::cmp::Ordering;

use serde::Serialize;

/// Outcome of a query that depends on optional analytic columns.
///
/// `Unavailable` is not an error: it is the designed answer when the uploaded
/// table simply lacks a column a view would need (say, no genre column).
/// Callers branch on it and surface the reason as a warning; hard failures
/// use [`Error`](crate::error::Error) instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Availability<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Availability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Availability::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    /// The value, if available.
    pub fn available(self) -> Option<T> {
        match self {
            Availability::Available(v) => Some(v),
            Availability::Unavailable { .. } => None,
        }
    }

    pub fn as_available(&self) -> Option<&T> {
        match self {
            Availability::Available(v) => Some(v),
            Availability::Unavailable { .. } => None,
        }
    }
}

/// Descending score order with NaN (undefined means) after every finite
/// score.  Used with stable sorts, so equal scores keep first-seen order.
pub(crate) fn cmp_score_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
