use std::sync::{Arc, Mutex, RwLock};

use gpui::prelude::*;
use gpui::{
    Bounds, MouseButton, MouseDownEvent, MouseMoveEvent, MouseUpEvent, Pixels, Point,
    ScrollWheelEvent, Window, canvas, div, px,
};

use crate::geom::{ScreenPoint, ScreenRect};
use crate::interaction::{pan_range, zoom_factor_from_scroll, zoom_range};
use crate::plotter::TilePlotter;
use crate::transform::Transform;
use crate::view::{Range, Viewport};

use super::config::TilePlotViewConfig;
use super::paint::{TileFrame, paint_frame};
use super::state::{DragState, ViewState, distance_sq, lock_view};

/// A GPUI view that renders a [`TilePlotter`] and handles pan and zoom.
///
/// Every frame polls resolved tiles, reconciles them into the view's render
/// buffer, and paints the drawn triangles.
#[derive(Clone)]
pub struct GpuiTilePlotView {
    plotter: Arc<Mutex<TilePlotter>>,
    state: Arc<RwLock<ViewState>>,
    config: TilePlotViewConfig,
}

impl GpuiTilePlotView {
    /// Create a view with the default [`TilePlotViewConfig`].
    pub fn new(plotter: TilePlotter) -> Self {
        Self::with_config(plotter, TilePlotViewConfig::default())
    }

    /// Create a view with a custom configuration.
    pub fn with_config(plotter: TilePlotter, config: TilePlotViewConfig) -> Self {
        let state = ViewState::new(plotter.layout());
        Self {
            plotter: Arc::new(Mutex::new(plotter)),
            state: Arc::new(RwLock::new(state)),
            config,
        }
    }

    /// Get a handle for driving the underlying plotter.
    pub fn plotter_handle(&self) -> TilePlotHandle {
        TilePlotHandle {
            plotter: Arc::clone(&self.plotter),
        }
    }

    fn on_mouse_down(&mut self, ev: &MouseDownEvent, cx: &mut Context<Self>) {
        let pos = screen_point(ev.position);
        let Ok(mut state) = self.state.write() else {
            return;
        };
        let inside = state.plot_rect.is_some_and(|rect| rect.contains(pos));
        state.drag = inside.then(|| DragState::new(pos));
        cx.notify();
    }

    fn on_mouse_move(&mut self, ev: &MouseMoveEvent, cx: &mut Context<Self>) {
        let pos = screen_point(ev.position);
        let Some((mut state, mut plotter)) = lock_view(&self.state, &self.plotter) else {
            return;
        };
        let Some(mut drag) = state.drag.clone() else {
            return;
        };

        if !drag.active && distance_sq(drag.start, pos) > self.config.drag_threshold_px.powi(2) {
            drag.active = true;
        }
        if drag.active {
            let next = state.transform.as_ref().and_then(|transform| {
                plotter
                    .visible_range()
                    .and_then(|range| pan_range(range, pos.x - drag.last.x, transform))
            });
            if let Some(next) = next {
                apply_visible_range(&mut plotter, next);
            }
            drag.last = pos;
        }
        state.drag = Some(drag);
        cx.notify();
    }

    fn on_mouse_up(&mut self, _ev: &MouseUpEvent, cx: &mut Context<Self>) {
        if let Ok(mut state) = self.state.write() {
            state.drag = None;
        }
        cx.notify();
    }

    fn on_scroll(&mut self, ev: &ScrollWheelEvent, _window: &Window, cx: &mut Context<Self>) {
        let pos = screen_point(ev.position);
        let delta = ev.delta.pixel_delta(px(16.0));
        let zoom_delta = -f32::from(delta.y);
        if zoom_delta.abs() < 0.01 {
            return;
        }
        let factor = zoom_factor_from_scroll(zoom_delta);

        let Some((state, mut plotter)) = lock_view(&self.state, &self.plotter) else {
            return;
        };
        let Some(transform) = state.transform.as_ref() else {
            return;
        };
        if let Some(range) = plotter.visible_range() {
            let center = transform
                .screen_to_data(pos)
                .map(|point| point.x + plotter.recenter_offset())
                .unwrap_or_else(|| range.center());
            apply_visible_range(&mut plotter, zoom_range(range, center, factor));
        }
        cx.notify();
    }
}

impl Render for GpuiTilePlotView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let plotter = Arc::clone(&self.plotter);
        let state = Arc::clone(&self.state);
        let config = self.config.clone();

        div()
            .size_full()
            .child(
                canvas(
                    move |bounds, window, _| {
                        let (mut state, mut plotter) = lock_view(&state, &plotter)?;
                        build_frame(&mut plotter, &mut state, &config, bounds, window)
                    },
                    move |_, frame, window, _| {
                        if let Some(frame) = frame {
                            paint_frame(&frame, window);
                        }
                    },
                )
                .size_full(),
            )
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|this, ev, _, cx| {
                    this.on_mouse_down(ev, cx);
                }),
            )
            .on_mouse_move(cx.listener(|this, ev, _, cx| {
                this.on_mouse_move(ev, cx);
            }))
            .on_mouse_up(
                MouseButton::Left,
                cx.listener(|this, ev, _, cx| {
                    this.on_mouse_up(ev, cx);
                }),
            )
            .on_scroll_wheel(cx.listener(|this, ev, window, cx| {
                this.on_scroll(ev, window, cx);
            }))
    }
}

/// A handle for driving a [`TilePlotter`] held inside a `GpuiTilePlotView`.
///
/// The handle clones cheaply and can be moved into async tasks. Calls
/// return `None` if the plotter lock was poisoned.
#[derive(Clone)]
pub struct TilePlotHandle {
    plotter: Arc<Mutex<TilePlotter>>,
}

impl TilePlotHandle {
    /// Read the plotter state.
    pub fn read<R>(&self, f: impl FnOnce(&TilePlotter) -> R) -> Option<R> {
        let plotter = self.plotter.lock().ok()?;
        Some(f(&plotter))
    }

    /// Mutate the plotter state.
    pub fn write<R>(&self, f: impl FnOnce(&mut TilePlotter) -> R) -> Option<R> {
        let mut plotter = self.plotter.lock().ok()?;
        Some(f(&mut plotter))
    }
}

fn build_frame(
    plotter: &mut TilePlotter,
    state: &mut ViewState,
    config: &TilePlotViewConfig,
    bounds: Bounds<Pixels>,
    window: &mut Window,
) -> Option<TileFrame> {
    let rect = ScreenRect::new(
        screen_point(bounds.origin),
        ScreenPoint::new(
            f32::from(bounds.origin.x + bounds.size.width),
            f32::from(bounds.origin.y + bounds.size.height),
        ),
    );
    state.plot_rect = Some(rect);

    plotter.poll_resolved();
    plotter.reconcile(&mut state.buffer);
    plotter.draw(&mut state.buffer);
    if config.refresh_while_loading && plotter.missing_tiles() > 0 {
        window.request_animation_frame();
    }

    let visible = plotter.visible_range()?;
    let values = plotter
        .min_max_in_range(visible)
        .padded(config.padding_frac, config.min_padding);
    state.transform = Transform::new(
        Viewport::new(visible, values),
        plotter.recenter_offset(),
        rect,
    );
    let triangles = state
        .transform
        .as_ref()
        .map(|transform| {
            state
                .buffer
                .screen_triangles(plotter.config().draw_mode, transform)
        })
        .unwrap_or_default();

    let style = plotter.config().style;
    let color = if plotter.config().draw_mode.joins_tiles() {
        style.stroke_color
    } else {
        style.fill_color
    };
    Some(TileFrame {
        rect,
        background: config.background,
        color,
        triangles,
    })
}

fn apply_visible_range(plotter: &mut TilePlotter, range: Range) {
    if let Err(err) = plotter.set_visible_range(range) {
        tracing::debug!(%err, "ignored visible range from gesture");
    }
}

fn screen_point(point: Point<Pixels>) -> ScreenPoint {
    ScreenPoint::new(f32::from(point.x), f32::from(point.y))
}
