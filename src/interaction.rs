//! Interaction helpers for panning and zooming the visible time range.
//!
//! Backends turn gestures into a new visible range and hand it to
//! [`TilePlotter::set_visible_range`](crate::TilePlotter::set_visible_range).

use crate::transform::Transform;
use crate::view::Range;

/// Smallest visible span a zoom may produce.
const MIN_ZOOM_SPAN: f64 = 1e-9;

/// Pan a time range by a horizontal pixel delta.
///
/// Dragging right moves the visible window toward earlier times.
pub fn pan_range(range: Range, delta_pixels: f32, transform: &Transform) -> Option<Range> {
    let dx = transform.pixels_to_x_delta(delta_pixels);
    if !dx.is_finite() {
        return None;
    }
    Some(range.shifted(-dx))
}

/// Zoom a time range around `center` by `factor`.
///
/// Factors below one zoom in, above one zoom out.
pub fn zoom_range(range: Range, center: f64, factor: f64) -> Range {
    if !factor.is_finite() || factor <= 0.0 || !center.is_finite() {
        return range;
    }
    let min = center + (range.min - center) * factor;
    let max = center + (range.max - center) * factor;
    Range::new(min, max).with_min_span(MIN_ZOOM_SPAN)
}

/// Compute a zoom factor from a vertical scroll delta in pixels.
pub fn zoom_factor_from_scroll(delta_pixels: f32) -> f64 {
    let normalized = delta_pixels as f64 / 240.0;
    (1.0 - normalized).clamp(0.1, 10.0)
}
