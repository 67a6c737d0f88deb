//! Scalar helpers over a recombined illuminance series.
//!
//! These mirror the aggregate endpoints the query engine offers on the
//! persisted side, for callers that already hold an in-memory series.

/// Sum of all values in the series.
pub fn cumulative(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean, or `None` for an empty series.
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    // Series lengths stay far below 2^52; the cast is exact.
    #[allow(clippy::cast_precision_loss)]
    Some(cumulative(values) / values.len() as f64)
}

/// Largest value, or `None` for an empty series.
pub fn peak(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Smallest value, or `None` for an empty series.
pub fn minimum(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_over_a_small_series() {
        let values = [10.0, 40.0, 25.0];
        assert!((cumulative(&values) - 75.0).abs() < 1e-9);
        assert_eq!(average(&values), Some(25.0));
        assert_eq!(peak(&values), Some(40.0));
        assert_eq!(minimum(&values), Some(10.0));
    }

    #[test]
    fn empty_series_yields_none() {
        assert_eq!(average(&[]), None);
        assert_eq!(peak(&[]), None);
        assert_eq!(minimum(&[]), None);
        assert!(cumulative(&[]).abs() < 1e-12);
    }
}
