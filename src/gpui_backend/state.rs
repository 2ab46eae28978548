use std::sync::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};

use crate::geom::{ScreenPoint, ScreenRect};
use crate::plotter::TilePlotter;
use crate::render::{BufferLayout, CpuRenderBuffer};
use crate::transform::Transform;

#[derive(Debug, Clone)]
pub(crate) struct DragState {
    pub(crate) start: ScreenPoint,
    pub(crate) last: ScreenPoint,
    pub(crate) active: bool,
}

impl DragState {
    pub(crate) fn new(start: ScreenPoint) -> Self {
        Self {
            start,
            last: start,
            active: false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ViewState {
    pub(crate) buffer: CpuRenderBuffer,
    pub(crate) plot_rect: Option<ScreenRect>,
    pub(crate) transform: Option<Transform>,
    pub(crate) drag: Option<DragState>,
}

impl ViewState {
    pub(crate) fn new(layout: BufferLayout) -> Self {
        Self {
            buffer: CpuRenderBuffer::new(layout),
            plot_rect: None,
            transform: None,
            drag: None,
        }
    }
}

pub(crate) fn distance_sq(a: ScreenPoint, b: ScreenPoint) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Lock the view state, then the plotter. Every caller goes through here so
/// the two locks are always taken in the same order.
pub(crate) fn lock_view<'a>(
    state: &'a RwLock<ViewState>,
    plotter: &'a Mutex<TilePlotter>,
) -> Option<(RwLockWriteGuard<'a, ViewState>, MutexGuard<'a, TilePlotter>)> {
    let state = state.write().ok()?;
    let plotter = plotter.lock().ok()?;
    Some((state, plotter))
}
