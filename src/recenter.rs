//! Recentering of absolute timestamps for single-precision rendering.
//!
//! Positions handed to the renderer are `timestamp - offset` as `f32`. The
//! offset only moves when a resident tile drifts past [`precision_limit`] of
//! it, or when the level changes, because moving it invalidates every
//! position in the cache.

use crate::mapping::{RangeMapper, TileWindow};
use crate::view::Range;

/// Mantissa bits of `f32` used as headroom above the level's resolution.
pub const PRECISION_BITS: i32 = 23;

/// Largest distance from the offset a tile edge may have at `level`:
/// `2^23` of the mapper's time units, i.e. `2^(level + 23)` for unit tiles.
pub fn precision_limit(mapper: &dyn RangeMapper, level: i32) -> f64 {
    mapper.time_unit(level) * 2f64.powi(PRECISION_BITS)
}

/// Tracks the translation subtracted from every timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OffsetRecenterer {
    offset: f64,
    level: Option<i32>,
}

impl OffsetRecenterer {
    /// Create a recenterer with a zero offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Level the offset was last computed for.
    pub fn level(&self) -> Option<i32> {
        self.level
    }

    /// Check whether every tile edge lies within the precision limit.
    pub fn is_within_limit(
        &self,
        mapper: &dyn RangeMapper,
        level: i32,
        offsets: impl IntoIterator<Item = i64>,
    ) -> bool {
        let limit = precision_limit(mapper, level);
        offsets.into_iter().all(|offset| {
            let start = mapper.tile_start_time(level, offset);
            let end = mapper.tile_end_time(level, offset);
            let distance = (self.offset - start).abs().max((self.offset - end).abs());
            distance <= limit
        })
    }

    /// Recompute the offset if needed. Returns true when it moved.
    ///
    /// `offsets` are the offsets of the active tiles of `window`.
    pub fn update(
        &mut self,
        mapper: &dyn RangeMapper,
        window: TileWindow,
        visible: Range,
        offsets: impl IntoIterator<Item = i64>,
    ) -> bool {
        let level_changed = self.level != Some(window.level);
        if !level_changed && self.is_within_limit(mapper, window.level, offsets) {
            return false;
        }
        let previous = self.offset;
        self.offset = visible.center();
        self.level = Some(window.level);
        tracing::debug!(
            level = window.level,
            previous,
            offset = self.offset,
            level_changed,
            "recentered tile positions"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PowerOfTwoMapper;

    #[test]
    fn first_update_always_recenters() {
        let mapper = PowerOfTwoMapper::new(1.0, 3);
        let mut recenter = OffsetRecenterer::new();
        let moved = recenter.update(
            &mapper,
            TileWindow::new(0, 0, 3),
            Range::new(0.0, 2.0),
            [0, 1, 2],
        );
        assert!(moved);
        assert_eq!(recenter.offset(), 1.0);
        assert_eq!(recenter.level(), Some(0));
    }

    #[test]
    fn small_pans_keep_the_offset() {
        let mapper = PowerOfTwoMapper::new(1.0, 3);
        let mut recenter = OffsetRecenterer::new();
        recenter.update(&mapper, TileWindow::new(0, 0, 3), Range::new(0.0, 2.0), [0, 1, 2]);
        let moved = recenter.update(
            &mapper,
            TileWindow::new(0, 1, 4),
            Range::new(1.0, 3.0),
            [1, 2, 3],
        );
        assert!(!moved);
        assert_eq!(recenter.offset(), 1.0);
    }

    #[test]
    fn distant_tiles_force_a_recenter() {
        let mapper = PowerOfTwoMapper::new(1.0, 3);
        let mut recenter = OffsetRecenterer::new();
        recenter.update(&mapper, TileWindow::new(0, 0, 3), Range::new(0.0, 2.0), [0, 1, 2]);
        let far = 1_i64 << 24;
        let moved = recenter.update(
            &mapper,
            TileWindow::new(0, far, far + 3),
            Range::new(far as f64, far as f64 + 2.0),
            [far, far + 1, far + 2],
        );
        assert!(moved);
        assert!(recenter.is_within_limit(&mapper, 0, [far, far + 1, far + 2]));
    }

    #[test]
    fn level_change_recenters_even_when_close() {
        let mapper = PowerOfTwoMapper::new(1.0, 3);
        let mut recenter = OffsetRecenterer::new();
        recenter.update(&mapper, TileWindow::new(0, 0, 3), Range::new(0.0, 2.0), [0]);
        let moved = recenter.update(&mapper, TileWindow::new(1, 0, 2), Range::new(0.0, 3.0), [0]);
        assert!(moved);
        assert_eq!(recenter.offset(), 1.5);
    }

    #[test]
    fn precision_limit_scales_with_level() {
        let mapper = PowerOfTwoMapper::new(1.0, 3);
        assert_eq!(precision_limit(&mapper, 0), 8_388_608.0);
        assert_eq!(precision_limit(&mapper, 2), 4.0 * 8_388_608.0);
    }

    #[test]
    fn precision_limit_follows_mapper_time_scale() {
        let coarse = PowerOfTwoMapper::new(1.0e7, 3);
        let fine = PowerOfTwoMapper::new(1.0e-3, 3);
        assert_eq!(precision_limit(&coarse, 1), 2.0e7 * 8_388_608.0);
        assert_eq!(precision_limit(&fine, 0), 1.0e-3 * 8_388_608.0);
    }

    #[test]
    fn coarse_tiles_settle_after_one_recenter() {
        let mapper = PowerOfTwoMapper::new(1.0e7, 3);
        let visible = Range::new(0.0, 2.0e7);
        let window = mapper.window_for(visible);
        let offsets: Vec<i64> = (window.start..window.end).collect();
        let mut recenter = OffsetRecenterer::new();
        assert!(recenter.update(&mapper, window, visible, offsets.clone()));
        assert!(!recenter.update(&mapper, window, visible, offsets.clone()));
        assert!(recenter.is_within_limit(&mapper, window.level, offsets));
    }

    #[test]
    fn fine_tiles_recenter_sooner() {
        let mapper = PowerOfTwoMapper::new(1.0e-3, 3);
        let mut recenter = OffsetRecenterer::new();
        recenter.update(&mapper, TileWindow::new(0, 0, 3), Range::new(0.0, 2.0e-3), [0, 1, 2]);
        // 2^24 tiles of 1ms is far below the unit-scale bound but past 2^23 units.
        let far = 1_i64 << 24;
        let moved = recenter.update(
            &mapper,
            TileWindow::new(0, far, far + 3),
            Range::new(far as f64 * 1.0e-3, (far + 2) as f64 * 1.0e-3),
            [far, far + 1, far + 2],
        );
        assert!(moved);
    }
}
