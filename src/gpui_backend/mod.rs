//! GPUI integration for gpui_tileplot.
//!
//! This module provides a GPUI view that reconciles a
//! [`TilePlotter`](crate::plotter::TilePlotter) into an in-memory render
//! buffer every frame, paints the resulting triangles, and turns drag and
//! scroll gestures into new visible ranges.

#![allow(clippy::collapsible_if)]

mod config;
mod paint;
mod state;
mod view;

pub use config::TilePlotViewConfig;
pub use view::{GpuiTilePlotView, TilePlotHandle};
