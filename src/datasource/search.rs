//! Binary search over ascending sequences.
//!
//! Every ordered lookup in the crate (value queries, range queries, and
//! neighbor lookups across the presentation order) goes through
//! [`lower_bound_by`].

use crate::datasource::Sample;
use crate::geom::Point;

/// Items ordered along the time axis.
pub trait Timestamped {
    /// Time coordinate of the item.
    fn timestamp(&self) -> f64;
}

impl Timestamped for Sample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

impl Timestamped for Point {
    fn timestamp(&self) -> f64 {
        self.x
    }
}

/// Return the smallest index `i` in `0..=items.len()` such that `pred` holds at
/// `i` but not at `i - 1`.
///
/// `pred` must be monotonic over `items`: false for a prefix, true for the rest.
/// Returns `items.len()` when the predicate never holds.
pub fn lower_bound_by<T>(items: &[T], mut pred: impl FnMut(&T) -> bool) -> usize {
    items.partition_point(|item| !pred(item))
}

/// Index of the first item with `timestamp >= t`.
pub fn first_at_or_after<T: Timestamped>(items: &[T], t: f64) -> usize {
    lower_bound_by(items, |item| item.timestamp() >= t)
}

/// Index of the first item with `timestamp > t`.
pub fn first_after<T: Timestamped>(items: &[T], t: f64) -> usize {
    lower_bound_by(items, |item| item.timestamp() > t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_bound_finds_transition() {
        let values = [1, 3, 3, 5, 8];
        assert_eq!(lower_bound_by(&values, |v| *v >= 3), 1);
        assert_eq!(lower_bound_by(&values, |v| *v > 3), 3);
        assert_eq!(lower_bound_by(&values, |v| *v >= 0), 0);
        assert_eq!(lower_bound_by(&values, |v| *v > 8), values.len());
    }

    #[test]
    fn lower_bound_on_empty_slice() {
        let values: [i32; 0] = [];
        assert_eq!(lower_bound_by(&values, |_| true), 0);
    }

    #[test]
    fn timestamp_bounds_bracket_duplicates() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ];
        assert_eq!(first_at_or_after(&points, 1.0), 1);
        assert_eq!(first_after(&points, 1.0), 3);
        assert_eq!(first_after(&points, -1.0), 0);
        assert_eq!(first_at_or_after(&points, 2.5), 4);
    }
}
