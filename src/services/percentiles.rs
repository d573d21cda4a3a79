//! Percentile helpers for already-sorted slices.
//!
//! - Empty input => `None`.
//! - `percentile <= 0` => first element.
//! - `percentile >= 100` => last element.
//! - Otherwise the position `percentile / 100 * (len - 1)` is interpolated
//!   linearly between the two neighbouring order statistics.

/// Returns the percentile value from a slice that is already sorted in
/// ascending order.
pub fn value_sorted(sorted_values: &[f64], percentile: f64) -> Option<f64> {
    let last = sorted_values.len().checked_sub(1)?;

    if percentile <= 0.0 {
        return sorted_values.first().copied();
    }
    if percentile >= 100.0 {
        return sorted_values.get(last).copied();
    }

    let position = (percentile / 100.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    let low = *sorted_values.get(lower)?;
    let high = *sorted_values.get(upper)?;
    Some(low + (high - low) * weight)
}

/// Value exceeded with the given probability, e.g. `exceedance_sorted(v, 90.0)`
/// is the P90 energy: the 10th percentile from the bottom.
pub fn exceedance_sorted(sorted_values: &[f64], exceedance: f64) -> Option<f64> {
    value_sorted(sorted_values, 100.0 - exceedance)
}

/// Sorts a copy of `values` ascending; NaN never reaches here.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_sorted_returns_none_for_empty_input() {
        let values: [f64; 0] = [];
        assert_eq!(value_sorted(&values, 50.0), None);
    }

    #[test]
    fn value_sorted_clamps_to_first_and_last() {
        let values = [10.0, 20.0, 30.0];
        assert_eq!(value_sorted(&values, -1.0), Some(10.0));
        assert_eq!(value_sorted(&values, 0.0), Some(10.0));
        assert_eq!(value_sorted(&values, 100.0), Some(30.0));
        assert_eq!(value_sorted(&values, 1000.0), Some(30.0));
    }

    #[test]
    fn value_sorted_interpolates_between_order_statistics() {
        // len=4 => positions in [0, 3]
        // p50 => position=1.5 => halfway between 2 and 4
        // p10 => position=0.3 => 0 + 0.3 * (2 - 0)
        let values = [0.0, 2.0, 4.0, 6.0];
        assert_eq!(value_sorted(&values, 50.0), Some(3.0));
        assert!((value_sorted(&values, 10.0).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn single_value_is_every_percentile() {
        assert_eq!(value_sorted(&[42.0], 10.0), Some(42.0));
        assert_eq!(value_sorted(&[42.0], 90.0), Some(42.0));
    }

    #[test]
    fn p90_exceedance_is_never_above_the_median() {
        let values = sorted_copy(&[9.0, 1.0, 5.0, 3.0, 7.0]);
        let p50 = value_sorted(&values, 50.0).unwrap();
        let p90 = exceedance_sorted(&values, 90.0).unwrap();
        assert_eq!(p50, 5.0);
        assert!((p90 - 1.8).abs() < 1e-12);
        assert!(p90 <= p50);
    }
}
