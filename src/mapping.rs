//! Mapping between real time ranges and tile coordinates.

use crate::cache::MIN_CAPACITY;
use crate::datasource::TileKey;
use crate::view::Range;

/// Tile coordinates covering a visible range: `[start, end)` at `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileWindow {
    /// Resolution level.
    pub level: i32,
    /// First offset (inclusive).
    pub start: i64,
    /// Last offset (exclusive).
    pub end: i64,
}

impl TileWindow {
    /// Create a window.
    pub fn new(level: i32, start: i64, end: i64) -> Self {
        Self { level, start, end }
    }

    /// Number of offsets in the window.
    pub fn len(&self) -> usize {
        (self.end - self.start).max(0) as usize
    }

    /// Check whether the window covers no offsets.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check whether a tile belongs to this window.
    pub fn contains(&self, key: TileKey) -> bool {
        key.level == self.level && key.offset >= self.start && key.offset < self.end
    }

    /// Keys of every tile in the window, in ascending offset order.
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.start..self.end).map(|offset| TileKey::new(self.level, offset))
    }
}

/// Pure mapping from time to tile coordinates.
///
/// Each offset at `level` spans a fixed duration and holds a fixed number of
/// samples. Implementations must be deterministic.
pub trait RangeMapper {
    /// Resolution level to display `range` at.
    fn level_for(&self, range: Range) -> i32;

    /// Offset of the tile containing `time` at `level`.
    fn offset_for(&self, time: f64, level: i32) -> i64;

    /// Absolute start time of a tile.
    fn tile_start_time(&self, level: i32, offset: i64) -> f64;

    /// Absolute end time of a tile (start of the next one).
    fn tile_end_time(&self, level: i32, offset: i64) -> f64 {
        self.tile_start_time(level, offset + 1)
    }

    /// Time span of one level unit at `level`.
    ///
    /// Recentering keeps tile edges within `2^23` of these units of the
    /// offset, so the unit must track the tile duration of `level`.
    fn time_unit(&self, level: i32) -> f64 {
        2f64.powi(level)
    }

    /// Tile window covering `range`.
    fn window_for(&self, range: Range) -> TileWindow {
        let level = self.level_for(range);
        let start = self.offset_for(range.min, level);
        let end = self.offset_for(range.max, level) + 1;
        TileWindow::new(level, start, end)
    }
}

/// Mapper whose tile duration doubles with every level.
///
/// A tile at level `L` spans `base_duration * 2^L`. Levels are chosen so that
/// `capacity - 1` tiles cover the visible span, which keeps every window at or
/// below `capacity` tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerOfTwoMapper {
    base_duration: f64,
    capacity: usize,
    min_level: i32,
    max_level: i32,
}

impl PowerOfTwoMapper {
    /// Create a mapper for a cache of `capacity` tiles.
    pub fn new(base_duration: f64, capacity: usize) -> Self {
        Self {
            base_duration: if base_duration > 0.0 && base_duration.is_finite() {
                base_duration
            } else {
                1.0
            },
            capacity: capacity.max(MIN_CAPACITY),
            min_level: -32,
            max_level: 62,
        }
    }

    /// Clamp chosen levels to `[min_level, max_level]`.
    pub fn with_level_bounds(mut self, min_level: i32, max_level: i32) -> Self {
        self.min_level = min_level.min(max_level);
        self.max_level = max_level.max(min_level);
        self
    }

    /// Duration of a single tile at `level`.
    pub fn tile_duration(&self, level: i32) -> f64 {
        self.base_duration * 2f64.powi(level)
    }
}

impl RangeMapper for PowerOfTwoMapper {
    fn level_for(&self, range: Range) -> i32 {
        let span = range.span();
        if !span.is_finite() || span <= 0.0 {
            return self.min_level;
        }
        let per_tile = span / (self.capacity - 1) as f64;
        let mut level = (per_tile / self.base_duration).log2().ceil() as i32;
        level = level.clamp(self.min_level, self.max_level);
        // log2 rounding can land one level short.
        while level < self.max_level
            && self.tile_duration(level) * ((self.capacity - 1) as f64) < span
        {
            level += 1;
        }
        level
    }

    fn offset_for(&self, time: f64, level: i32) -> i64 {
        (time / self.tile_duration(level)).floor() as i64
    }

    fn tile_start_time(&self, level: i32, offset: i64) -> f64 {
        offset as f64 * self.tile_duration(level)
    }

    fn time_unit(&self, level: i32) -> f64 {
        self.tile_duration(level)
    }
}
