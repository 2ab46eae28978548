use crate::render::Color;

/// Configuration for the GPUI tile plot view.
#[derive(Debug, Clone)]
pub struct TilePlotViewConfig {
    /// Pixel threshold for starting a drag.
    pub drag_threshold_px: f32,
    /// Padding fraction applied to the value range of visible data.
    pub padding_frac: f64,
    /// Minimum padding applied to the value range of visible data.
    pub min_padding: f64,
    /// Background color.
    pub background: Color,
    /// Keep requesting frames while visible tiles are missing.
    pub refresh_while_loading: bool,
}

impl Default for TilePlotViewConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 4.0,
            padding_frac: 0.05,
            min_padding: 1e-6,
            background: Color::new(0.07, 0.07, 0.08, 1.0),
            refresh_while_loading: true,
        }
    }
}
