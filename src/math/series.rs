//! Series Math
//!
//! This module contains the numeric building blocks of the data pipeline:
//! gap interpolation over sampled columns and the descriptive statistics
//! backing the dashboard tables and the boxplot.

use log::trace;
use nalgebra::DVector;

/// Fills gaps (NaN entries) in a column by linear interpolation along the
/// row index, searching in both directions.
///
/// Interior gaps are interpolated linearly between the bounding known
/// values. Leading gaps take the first known value, trailing gaps the last
/// known value. A column without any known value is returned unchanged.
///
/// The row index is the interpolation axis, so the result depends on row
/// order; the input is expected to already be in temporal order.
///
/// # Arguments
/// - `values`: A slice of samples where gaps are encoded as `f64::NAN`.
///
/// # Returns
/// A new vector with all bounded and edge gaps filled.
pub fn interpolate_both(values: &[f64]) -> Vec<f64> {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| (!v.is_nan()).then_some(i))
        .collect();

    if known.is_empty() {
        trace!("interpolation skipped, column has no anchor values");
        return values.to_vec();
    }

    let mut filled = values.to_vec();
    // Index of the last known sample at or before the cursor.
    let mut anchor = 0usize;
    for (i, slot) in filled.iter_mut().enumerate() {
        if !slot.is_nan() {
            continue;
        }
        while anchor + 1 < known.len() && known[anchor + 1] < i {
            anchor += 1;
        }
        *slot = if i < known[0] {
            values[known[0]]
        } else if i > *known.last().unwrap() {
            values[*known.last().unwrap()]
        } else {
            let lo = known[anchor];
            let hi = known[anchor + 1];
            let t = (i - lo) as f64 / (hi - lo) as f64;
            values[lo] + t * (values[hi] - values[lo])
        };
    }
    filled
}

/// Computes the `q`-quantile of already sorted data with linear
/// interpolation between the two nearest order statistics.
///
/// # Arguments
/// - `sorted`: Ascending, gap-free samples. Must not be empty.
/// - `q`: Quantile in `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Descriptive statistics of one numeric column.
#[derive(Clone, Copy, Debug)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Computes descriptive statistics over the finite samples of a column.
///
/// Gaps (NaN) are ignored; a column without finite samples yields `None`.
pub fn describe(values: &[f64]) -> Option<ColumnSummary> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let n = finite.len();
    let vec = DVector::from_row_slice(&finite);
    let std = if n > 1 {
        (vec.variance() * n as f64 / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    Some(ColumnSummary {
        count: n,
        mean: vec.mean(),
        std,
        min: finite[0],
        q25: quantile(&finite, 0.25),
        median: quantile(&finite, 0.5),
        q75: quantile(&finite, 0.75),
        max: finite[n - 1],
    })
}

/// Five-number summary for a boxplot with 1.5 IQR whiskers.
#[derive(Clone, Debug)]
pub struct BoxplotSummary {
    /// Smallest sample above the lower fence.
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Largest sample below the upper fence.
    pub upper_whisker: f64,
    /// Samples beyond the whiskers.
    pub outliers: Vec<f64>,
}

/// Computes a boxplot summary over the finite samples of a column.
///
/// Whiskers are clamped to the most extreme samples within 1.5 IQR of the
/// quartiles; everything beyond is reported as an outlier.
pub fn boxplot_summary(values: &[f64]) -> Option<BoxplotSummary> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let q1 = quantile(&finite, 0.25);
    let q3 = quantile(&finite, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let lower_whisker = finite
        .iter()
        .copied()
        .find(|v| *v >= lower_fence)
        .unwrap_or(q1);
    let upper_whisker = finite
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= upper_fence)
        .unwrap_or(q3);
    let outliers = finite
        .iter()
        .copied()
        .filter(|v| *v < lower_fence || *v > upper_fence)
        .collect();

    Some(BoxplotSummary {
        lower_whisker,
        q1,
        median: quantile(&finite, 0.5),
        q3,
        upper_whisker,
        outliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    #[test]
    fn interpolation_fills_interior_gaps_linearly() {
        let filled = interpolate_both(&[1.0, NAN, NAN, 4.0]);
        assert_eq!(filled, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn interpolation_fills_edge_gaps_from_nearest_value() {
        let filled = interpolate_both(&[NAN, NAN, 5.0, 6.0]);
        assert_eq!(filled, vec![5.0, 5.0, 5.0, 6.0]);
        let filled = interpolate_both(&[5.0, 6.0, NAN, NAN]);
        assert_eq!(filled, vec![5.0, 6.0, 6.0, 6.0]);
    }

    #[test]
    fn interpolation_without_anchors_is_a_noop() {
        let filled = interpolate_both(&[NAN, NAN, NAN]);
        assert!(filled.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn interpolation_is_idempotent() {
        let once = interpolate_both(&[NAN, 1.0, NAN, 3.0, NAN, NAN, 9.0, NAN]);
        let twice = interpolate_both(&once);
        assert_eq!(once, twice);
        assert!(once.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn quantiles_interpolate_between_order_statistics() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&data, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile(&data, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&data, 1.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn describe_ignores_gaps_and_matches_sample_std() {
        let summary = describe(&[2.0, NAN, 4.0, 4.0, 4.0, 5.0, 5.0, NAN, 7.0, 9.0]).unwrap();
        assert_eq!(summary.count, 8);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        // Sample variance of [2,4,4,4,5,5,7,9] is 32/7.
        assert!((summary.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
    }

    #[test]
    fn describe_of_empty_column_is_none() {
        assert!(describe(&[NAN, NAN]).is_none());
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn boxplot_flags_points_beyond_the_fences() {
        let mut data: Vec<f64> = (1..=20).map(f64::from).collect();
        data.push(200.0);
        let summary = boxplot_summary(&data).unwrap();
        assert_eq!(summary.outliers, vec![200.0]);
        assert!(summary.upper_whisker <= 20.0);
        assert!(summary.lower_whisker >= 1.0);
        assert!(summary.q1 < summary.median && summary.median < summary.q3);
    }
}
