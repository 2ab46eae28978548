//! Draw modes and per-plot styling.

use crate::render::Color;

/// How samples are turned into geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawMode {
    /// A fixed-size square per sample.
    Points,
    /// A bar from zero to the sample value.
    Bars,
    /// Connected line segments, joined across tile boundaries.
    #[default]
    Lines,
}

impl DrawMode {
    /// Whether vertex offsets are expressed in pixels (otherwise data units).
    pub fn offsets_in_pixels(self) -> bool {
        !matches!(self, Self::Bars)
    }

    /// Whether geometry depends on samples of adjacent tiles.
    pub fn joins_tiles(self) -> bool {
        matches!(self, Self::Lines)
    }
}

/// Styling shared by every sample of a plot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileStyle {
    /// Point marker size in pixels.
    pub point_size: f32,
    /// Line stroke width in pixels.
    pub stroke_width: f32,
    /// Fill color for points and bars.
    pub fill_color: Color,
    /// Stroke color for lines and outlines.
    pub stroke_color: Color,
}

impl Default for TileStyle {
    fn default() -> Self {
        Self {
            point_size: 4.0,
            stroke_width: 1.5,
            fill_color: Color::new(0.25, 0.52, 0.96, 0.6),
            stroke_color: Color::new(0.25, 0.52, 0.96, 1.0),
        }
    }
}
