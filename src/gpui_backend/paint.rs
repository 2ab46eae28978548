use gpui::{
    BorderStyle, Bounds, ContentMask, Corners, Edges, PathBuilder, Pixels, Window, point, px, quad,
};

use crate::geom::{ScreenPoint, ScreenRect};
use crate::render::Color;

/// Screen-space geometry of one frame.
#[derive(Debug, Clone)]
pub(crate) struct TileFrame {
    pub(crate) rect: ScreenRect,
    pub(crate) background: Color,
    pub(crate) color: Color,
    pub(crate) triangles: Vec<[ScreenPoint; 3]>,
}

pub(crate) fn paint_frame(frame: &TileFrame, window: &mut Window) {
    let bounds = to_bounds(frame.rect);
    window.paint_quad(quad(
        bounds,
        Corners::all(px(0.0)),
        to_rgba(frame.background),
        Edges::all(px(0.0)),
        to_rgba(frame.background),
        BorderStyle::default(),
    ));
    if frame.triangles.is_empty() {
        return;
    }
    let mask = ContentMask { bounds };
    window.with_content_mask(Some(mask), |window| {
        paint_triangles(window, &frame.triangles, frame.color);
    });
}

fn paint_triangles(window: &mut Window, triangles: &[[ScreenPoint; 3]], color: Color) {
    let mut builder = PathBuilder::fill();
    for [a, b, c] in triangles {
        builder.move_to(point(px(a.x), px(a.y)));
        builder.line_to(point(px(b.x), px(b.y)));
        builder.line_to(point(px(c.x), px(c.y)));
        builder.close();
    }
    if let Ok(path) = builder.build() {
        window.paint_path(path, to_rgba(color));
    }
}

fn to_rgba(color: Color) -> gpui::Rgba {
    gpui::Rgba {
        r: color.r,
        g: color.g,
        b: color.b,
        a: color.a,
    }
}

fn to_bounds(rect: ScreenRect) -> Bounds<Pixels> {
    Bounds::from_corners(
        point(px(rect.min.x), px(rect.min.y)),
        point(px(rect.max.x), px(rect.max.y)),
    )
}
