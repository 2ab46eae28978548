//! Per-draw-mode vertex generation.
//!
//! Every sample owns four vertices and six indices regardless of mode, so a
//! slot's buffer footprint never depends on the draw mode.

use crate::datasource::Sample;
use crate::render::{INDICES_PER_SAMPLE, VERTICES_PER_SAMPLE, VertexAttributes, VertexPosition};
use crate::style::{DrawMode, TileStyle};

/// Break marker used where a segment has no valid neighbor.
const BREAK: [f32; 2] = [f32::NAN, f32::NAN];

/// Edge samples of the logically adjacent tiles, in recentered coordinates.
///
/// `None` means the neighbor is absent, non-contiguous, or empty, and the
/// boundary segment is broken.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeNeighbors {
    /// Last sample of the tile at `offset - 1`.
    pub previous: Option<[f64; 2]>,
    /// First sample of the tile at `offset + 1`.
    pub next: Option<[f64; 2]>,
}

/// Recentered position of a sample in `f64`.
pub fn recentered(sample: &Sample, offset: f64) -> [f64; 2] {
    [sample.timestamp - offset, sample.value]
}

/// Vertex positions: the recentered sample, repeated for each of its vertices.
pub fn build_positions(samples: &[Sample], offset: f64) -> Vec<VertexPosition> {
    let mut positions = Vec::with_capacity(samples.len() * VERTICES_PER_SAMPLE);
    for sample in samples {
        let [x, y] = recentered(sample, offset);
        let position = [x as f32, y as f32];
        positions.extend(std::iter::repeat_n(position, VERTICES_PER_SAMPLE));
    }
    positions
}

/// Vertex attributes for `mode`.
pub fn build_attributes(
    mode: DrawMode,
    style: &TileStyle,
    samples: &[Sample],
    offset: f64,
    neighbors: EdgeNeighbors,
) -> Vec<VertexAttributes> {
    let mut attributes = Vec::with_capacity(samples.len() * VERTICES_PER_SAMPLE);
    for index in 0..samples.len() {
        let offsets = match mode {
            DrawMode::Points => point_offsets(style.point_size),
            DrawMode::Bars => bar_offsets(samples, index),
            DrawMode::Lines => line_offsets(samples, index, offset, neighbors),
        };
        let template = VertexAttributes {
            offset: [0.0; 2],
            size: style.point_size,
            stroke_width: style.stroke_width,
            color_map_value: samples[index].value as f32,
            fill_color: style.fill_color.to_array(),
            stroke_color: style.stroke_color.to_array(),
        };
        attributes.extend(offsets.into_iter().map(|offset| VertexAttributes {
            offset,
            ..template
        }));
    }
    attributes
}

/// Presentation indices for a tile whose first vertex is `vertex_base`.
///
/// `successor_base` is the first vertex of the next tile's slot when lines
/// may join across the boundary. The result always holds
/// `samples_per_tile * INDICES_PER_SAMPLE` entries; unused samples are
/// degenerate.
pub fn build_indices(
    mode: DrawMode,
    len: usize,
    samples_per_tile: usize,
    vertex_base: u32,
    successor_base: Option<u32>,
) -> Vec<u32> {
    let mut indices = Vec::with_capacity(samples_per_tile * INDICES_PER_SAMPLE);
    for index in 0..len.min(samples_per_tile) {
        let own = vertex_base + (index * VERTICES_PER_SAMPLE) as u32;
        match mode {
            DrawMode::Points | DrawMode::Bars => {
                indices.extend_from_slice(&[own, own + 1, own + 2, own + 2, own + 1, own + 3]);
            }
            DrawMode::Lines => {
                let successor = if index + 1 < len {
                    Some(own + VERTICES_PER_SAMPLE as u32)
                } else {
                    successor_base
                };
                match successor {
                    Some(next) => indices.extend_from_slice(&[
                        own + 2,
                        own + 3,
                        next,
                        next,
                        own + 3,
                        next + 1,
                    ]),
                    None => indices.extend(std::iter::repeat_n(own, INDICES_PER_SAMPLE)),
                }
            }
        }
    }
    indices.resize(samples_per_tile * INDICES_PER_SAMPLE, vertex_base);
    indices
}

/// Indices that draw nothing, for presentation positions without a tile.
pub fn degenerate_indices(samples_per_tile: usize, vertex_base: u32) -> Vec<u32> {
    vec![vertex_base; samples_per_tile * INDICES_PER_SAMPLE]
}

fn point_offsets(size: f32) -> [[f32; 2]; VERTICES_PER_SAMPLE] {
    let h = size * 0.5;
    [[-h, -h], [h, -h], [-h, h], [h, h]]
}

fn bar_offsets(samples: &[Sample], index: usize) -> [[f32; 2]; VERTICES_PER_SAMPLE] {
    let x = samples[index].timestamp;
    let left = index
        .checked_sub(1)
        .map(|prev| 0.5 * (x - samples[prev].timestamp));
    let right = samples
        .get(index + 1)
        .map(|next| 0.5 * (next.timestamp - x));
    let half_width: f64 = match (left, right) {
        (Some(left), Some(right)) => left.min(right),
        (Some(gap), None) | (None, Some(gap)) => gap,
        (None, None) => 0.0,
    };
    let half_width = half_width as f32;
    let height = samples[index].value as f32;
    [
        [-half_width, -height],
        [half_width, -height],
        [-half_width, 0.0],
        [half_width, 0.0],
    ]
}

fn line_offsets(
    samples: &[Sample],
    index: usize,
    offset: f64,
    neighbors: EdgeNeighbors,
) -> [[f32; 2]; VERTICES_PER_SAMPLE] {
    let here = recentered(&samples[index], offset);
    let previous = match index.checked_sub(1) {
        Some(prev) => Some(recentered(&samples[prev], offset)),
        None => neighbors.previous,
    };
    let next = match samples.get(index + 1) {
        Some(next) => Some(recentered(next, offset)),
        None => neighbors.next,
    };
    let incoming = previous.map_or(BREAK, |previous| segment_normal(previous, here));
    let outgoing = next.map_or(BREAK, |next| segment_normal(here, next));
    [
        incoming,
        [-incoming[0], -incoming[1]],
        outgoing,
        [-outgoing[0], -outgoing[1]],
    ]
}

/// Unit normal `(-dy, dx) / |d|` of the segment `a -> b`.
///
/// Zero-length segments get a zero normal; gaps propagate `NaN`.
pub fn segment_normal(a: [f64; 2], b: [f64; 2]) -> [f32; 2] {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let length = dx.hypot(dy);
    if length == 0.0 {
        return [0.0, 0.0];
    }
    [(-dy / length) as f32, (dx / length) as f32]
}
