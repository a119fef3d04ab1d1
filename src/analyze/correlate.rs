use serde::Serialize;

use crate::analyze::Availability;
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Correlation matrix
// ---------------------------------------------------------------------------

/// Symmetric Pearson correlation matrix over the dataset's numeric columns.
///
/// `coefficients[i][j]` correlates `fields[i]` with `fields[j]`; entries are
/// NaN where the coefficient is undefined (zero variance, or fewer than two
/// complete pairs). The diagonal is 1.0 for every column with variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<String>,
    pub coefficients: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Coefficient for a pair of field names, if both are in the matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.fields.iter().position(|f| f == a)?;
        let j = self.fields.iter().position(|f| f == b)?;
        Some(self.coefficients[i][j])
    }
}

/// Correlate every pair of numeric columns, pairwise-complete: each pair uses
/// exactly the rows where both cells are present, independent of any other
/// column's missingness.
///
/// A table with no numeric columns answers `Unavailable`; that is a
/// different situation from degenerate all-equal data, which yields a matrix
/// full of NaN but still reports its shape.
pub fn correlation_matrix(ds: &Dataset) -> Availability<CorrelationMatrix> {
    let fields = ds.numeric_columns().to_vec();
    if fields.is_empty() {
        return Availability::unavailable(
            "the uploaded table has no numeric columns to correlate",
        );
    }

    // One pass per column: missing cells stay None so pairs can be skipped.
    let columns: Vec<Vec<Option<f64>>> = fields
        .iter()
        .map(|field| {
            ds.rows()
                .iter()
                .map(|row| {
                    let value = &row[field];
                    if value.is_missing() {
                        None
                    } else {
                        value.as_f64()
                    }
                })
                .collect()
        })
        .collect();

    let n = fields.len();
    let mut coefficients = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson_pairwise(&columns[i], &columns[j]);
            coefficients[i][j] = r;
            coefficients[j][i] = r;
        }
    }

    Availability::Available(CorrelationMatrix {
        fields,
        coefficients,
    })
}

/// Pearson coefficient over the rows where both cells are present.
/// NaN when fewer than two complete pairs exist or either side has zero
/// variance; finite results are clamped to [-1, 1] against rounding drift.
fn pearson_pairwise(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let mut n = 0.0_f64;
    let mut sum_x = 0.0_f64;
    let mut sum_y = 0.0_f64;
    let mut sum_xy = 0.0_f64;
    let mut sum_x2 = 0.0_f64;
    let mut sum_y2 = 0.0_f64;

    for (x, y) in xs.iter().zip(ys.iter()) {
        let (Some(x), Some(y)) = (*x, *y) else { continue };
        n += 1.0;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
        sum_y2 += y * y;
    }

    if n < 2.0 {
        return f64::NAN;
    }

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        f64::NAN
    } else {
        (numerator / denominator).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Row, Value, ValueKind};
    use std::collections::BTreeMap;

    fn numeric_table(columns: &[(&str, &[Option<f64>])]) -> Dataset {
        let column_names: Vec<String> = columns.iter().map(|(n, _)| n.to_string()).collect();
        let kinds: BTreeMap<String, ValueKind> = column_names
            .iter()
            .map(|n| (n.clone(), ValueKind::Numeric))
            .collect();
        let n_rows = columns[0].1.len();
        let rows: Vec<Row> = (0..n_rows)
            .map(|r| {
                columns
                    .iter()
                    .map(|(name, values)| {
                        (
                            name.to_string(),
                            values[r].map_or(Value::Null, Value::Float),
                        )
                    })
                    .collect()
            })
            .collect();
        Dataset::new(column_names, kinds, rows)
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let ds = numeric_table(&[
            ("popularity", &[Some(10.0), Some(20.0), Some(35.0)]),
            ("energy", &[Some(0.9), Some(0.4), Some(0.2)]),
        ]);
        let m = correlation_matrix(&ds).available().unwrap();
        assert_eq!(m.fields.len(), 2);
        assert_eq!(
            m.get("popularity", "energy"),
            m.get("energy", "popularity")
        );
        assert!((m.get("popularity", "popularity").unwrap() - 1.0).abs() < 1e-12);
        assert!(m.get("popularity", "energy").unwrap() < 0.0);
    }

    #[test]
    fn perfect_linear_relation_hits_the_bounds() {
        let ds = numeric_table(&[
            ("x", &[Some(1.0), Some(2.0), Some(3.0)]),
            ("y", &[Some(2.0), Some(4.0), Some(6.0)]),
            ("z", &[Some(-1.0), Some(-2.0), Some(-3.0)]),
        ]);
        let m = correlation_matrix(&ds).available().unwrap();
        assert!((m.get("x", "y").unwrap() - 1.0).abs() < 1e-12);
        assert!((m.get("x", "z").unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pairs_are_pairwise_complete() {
        // Row 3's missing z must not affect the x/y pair.
        let ds = numeric_table(&[
            ("x", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ("y", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ("z", &[Some(4.0), Some(3.0), Some(2.0), None]),
        ]);
        let m = correlation_matrix(&ds).available().unwrap();
        assert!((m.get("x", "y").unwrap() - 1.0).abs() < 1e-12);
        // x/z uses only the three complete pairs.
        assert!((m.get("x", "z").unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_yields_nan_but_keeps_shape() {
        let ds = numeric_table(&[("constant", &[Some(5.0), Some(5.0), Some(5.0)])]);
        let m = correlation_matrix(&ds).available().unwrap();
        assert_eq!(m.fields, vec!["constant".to_string()]);
        assert_eq!(m.coefficients.len(), 1);
        assert!(m.get("constant", "constant").unwrap().is_nan());
    }

    #[test]
    fn no_numeric_columns_is_unavailable() {
        let kinds: BTreeMap<String, ValueKind> =
            [("artists".to_string(), ValueKind::Text)].into_iter().collect();
        let rows = vec![[("artists".to_string(), Value::String("A".into()))]
            .into_iter()
            .collect()];
        let ds = Dataset::new(vec!["artists".to_string()], kinds, rows);
        assert!(!correlation_matrix(&ds).is_available());
    }
}
