//! Coordinate transforms between recentered data space and screen space.
//!
//! Positions in the render buffer are already relative to the recenter
//! offset, so the transform's X range must be expressed the same way.

use crate::geom::{Point, ScreenPoint, ScreenRect};
use crate::view::Viewport;

const MIN_SPAN: f64 = 1e-12;

/// Transform from recentered data coordinates into screen coordinates.
#[derive(Debug, Clone)]
pub struct Transform {
    viewport: Viewport,
    screen: ScreenRect,
}

impl Transform {
    /// Create a transform for the given viewport and screen rectangle.
    ///
    /// `recenter_offset` is subtracted from the viewport's X range so that
    /// buffer positions map directly.
    pub fn new(viewport: Viewport, recenter_offset: f64, screen: ScreenRect) -> Option<Self> {
        if !screen.is_valid() || !viewport.x.is_finite() || !viewport.y.is_finite() {
            return None;
        }
        let x = viewport.x.shifted(-recenter_offset).with_min_span(MIN_SPAN);
        let y = viewport.y.with_min_span(MIN_SPAN);
        Some(Self {
            viewport: Viewport::new(x, y),
            screen,
        })
    }

    /// Access the recentered viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Access the screen rectangle.
    pub fn screen(&self) -> ScreenRect {
        self.screen
    }

    /// Pixels per data unit along X.
    pub fn x_scale(&self) -> f64 {
        self.screen.width() as f64 / self.viewport.x.span()
    }

    /// Pixels per data unit along Y.
    pub fn y_scale(&self) -> f64 {
        self.screen.height() as f64 / self.viewport.y.span()
    }

    /// Map a recentered data point into screen space. Gaps map to `None`.
    pub fn data_to_screen(&self, point: Point) -> Option<ScreenPoint> {
        if !point.is_finite() {
            return None;
        }
        let dx = (point.x - self.viewport.x.min) * self.x_scale();
        let dy = (point.y - self.viewport.y.min) * self.y_scale();
        Some(ScreenPoint::new(
            self.screen.min.x + dx as f32,
            self.screen.max.y - dy as f32,
        ))
    }

    /// Map a screen point into recentered data space.
    pub fn screen_to_data(&self, point: ScreenPoint) -> Option<Point> {
        let dx = f64::from(point.x - self.screen.min.x);
        let dy = f64::from(self.screen.max.y - point.y);
        let data = Point::new(
            self.viewport.x.min + dx / self.x_scale(),
            self.viewport.y.min + dy / self.y_scale(),
        );
        data.is_finite().then_some(data)
    }

    /// Convert a horizontal pixel delta into a data-space delta.
    pub fn pixels_to_x_delta(&self, pixels: f32) -> f64 {
        pixels as f64 / self.x_scale()
    }
}
