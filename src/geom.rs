//! Coordinate types for the two spaces a sparkline lives in.
//!
//! [`Point`] carries `f64` data coordinates (timestamp and value). Screen
//! types carry `f32` pixels, with `y` growing downwards.

/// A timestamp/value pair in data space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Timestamp, or timestamp minus the recenter offset.
    pub x: f64,
    /// Sample value. `NaN` marks a gap.
    pub y: f64,
}

impl Point {
    /// Create a data-space point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A position in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// Horizontal pixel position.
    pub x: f32,
    /// Vertical pixel position, growing downwards.
    pub y: f32,
}

impl ScreenPoint {
    /// Create a pixel position.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle spanning `min` (top-left) to `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    /// Top-left corner.
    pub min: ScreenPoint,
    /// Bottom-right corner.
    pub max: ScreenPoint,
}

impl ScreenRect {
    /// Build a rectangle from its top-left and bottom-right corners.
    pub fn new(min: ScreenPoint, max: ScreenPoint) -> Self {
        Self { min, max }
    }

    /// Width in pixels.
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Height in pixels.
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// A rectangle with zero or negative extent on either axis cannot host a
    /// transform.
    pub fn is_valid(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }

    /// Inclusive hit test.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        (self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
    }
}
