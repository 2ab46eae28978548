//! Value and range lookups over the presented tiles.

use crate::cache::Tile;
use crate::datasource::search::{first_after, first_at_or_after};
use crate::geom::Point;
use crate::view::Range;

/// Range returned by [`RangeQueryEngine::min_max_in_range`] when no finite
/// value falls inside the query.
pub const FALLBACK_RANGE: Range = Range { min: -1.0, max: 1.0 };

/// Flattened `(timestamp, value)` index of the active tiles.
///
/// Points are concatenated in presentation order, which is ascending time,
/// so every lookup is a binary search.
#[derive(Debug, Clone, Default)]
pub struct RangeQueryEngine {
    points: Vec<Point>,
}

impl RangeQueryEngine {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index with the samples of `tiles`, in the given order.
    pub fn rebuild<'a>(&mut self, tiles: impl IntoIterator<Item = &'a Tile>) {
        self.points.clear();
        for tile in tiles {
            self.points.extend(
                tile.samples()
                    .iter()
                    .map(|sample| Point::new(sample.timestamp, sample.value)),
            );
        }
    }

    /// Indexed points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at time `t`.
    ///
    /// With `interpolate`, the bracketing samples are blended linearly;
    /// otherwise the nearer one is picked. Times outside the indexed data
    /// clamp to the first or last sample. Returns `None` for an empty index,
    /// a non-finite `t`, or a gap.
    pub fn value_near(&self, t: f64, interpolate: bool) -> Option<f64> {
        if !t.is_finite() {
            return None;
        }
        let index = first_after(&self.points, t);
        let value = if index == 0 {
            self.points.first()?.y
        } else if index == self.points.len() {
            self.points.last()?.y
        } else {
            let before = self.points[index - 1];
            let after = self.points[index];
            let span = after.x - before.x;
            let frac = if span > 0.0 { (t - before.x) / span } else { 0.0 };
            if interpolate {
                before.y + (after.y - before.y) * frac
            } else if frac < 0.5 {
                before.y
            } else {
                after.y
            }
        };
        value.is_finite().then_some(value)
    }

    /// Finite value extent within `range`, or [`FALLBACK_RANGE`].
    ///
    /// Use [`has_data_in`](Self::has_data_in) to tell the fallback apart
    /// from real data.
    pub fn min_max_in_range(&self, range: Range) -> Range {
        let mut values = self.finite_values_in(range);
        let Some(first) = values.next() else {
            return FALLBACK_RANGE;
        };
        let mut extent = Range { min: first, max: first };
        for value in values {
            extent.expand_to_include(value);
        }
        extent
    }

    /// Check whether any finite value lies within `range`.
    pub fn has_data_in(&self, range: Range) -> bool {
        self.finite_values_in(range).next().is_some()
    }

    /// Time extent of the indexed points.
    pub fn bounds(&self) -> Option<Range> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some(Range::new(first.x, last.x))
    }

    fn finite_values_in(&self, range: Range) -> impl Iterator<Item = f64> + '_ {
        let start = first_at_or_after(&self.points, range.min);
        let end = first_after(&self.points, range.max).max(start);
        self.points[start..end]
            .iter()
            .map(|point| point.y)
            .filter(|value| value.is_finite())
    }
}
