//! Render buffer contract, vertex layout, and an in-memory buffer.
//!
//! The render buffer is owned by the backend. The plotter only ever writes
//! byte sub-ranges of three fixed-size regions and issues range-limited draw
//! calls; it never reads the buffer back.

pub mod geometry;
pub mod sync;

use bytemuck::{Pod, Zeroable};

use crate::geom::{Point, ScreenPoint};
use crate::style::DrawMode;
use crate::transform::Transform;

/// Vertices emitted per sample in every draw mode.
pub const VERTICES_PER_SAMPLE: usize = 4;
/// Indices emitted per sample in every draw mode (two triangles).
pub const INDICES_PER_SAMPLE: usize = 6;

/// RGBA color in linear space.
///
/// All components are expected to be in the 0.0..=1.0 range.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Color {
    /// Create a new color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Components as an array.
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Recentered `(time, value)` position of a vertex.
pub type VertexPosition = [f32; 2];

/// Per-vertex attributes besides position.
///
/// `offset` is in pixels for points and lines and in data units for bars
/// (see [`DrawMode::offsets_in_pixels`](crate::style::DrawMode::offsets_in_pixels)).
/// For lines it is the unit normal of the adjacent segment, scaled by half
/// the stroke width at raster time.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexAttributes {
    /// Displacement from the vertex position.
    pub offset: [f32; 2],
    /// Marker size in pixels.
    pub size: f32,
    /// Stroke width in pixels.
    pub stroke_width: f32,
    /// Value fed to color mapping.
    pub color_map_value: f32,
    /// Fill color.
    pub fill_color: [f32; 4],
    /// Stroke color.
    pub stroke_color: [f32; 4],
}

/// Regions of the render buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferRegion {
    /// Vertex positions, laid out by physical slot.
    Positions,
    /// Vertex attributes, laid out by physical slot.
    Attributes,
    /// Triangle indices, laid out by presentation position.
    Indices,
}

/// Backend-owned buffer receiving incremental uploads.
pub trait RenderBuffer {
    /// Overwrite `data.len()` bytes of `region` starting at `byte_offset`.
    fn upload_sub_range(&mut self, region: BufferRegion, byte_offset: usize, data: &[u8]);

    /// Draw `count` indices starting at `start_index`.
    fn issue_draw_range(&mut self, start_index: u32, count: u32);
}

/// Fixed sizes and offsets of the render buffer regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    /// Number of cache slots.
    pub capacity: usize,
    /// Samples held by one slot.
    pub samples_per_tile: usize,
}

impl BufferLayout {
    /// Create a layout.
    pub fn new(capacity: usize, samples_per_tile: usize) -> Self {
        Self {
            capacity,
            samples_per_tile,
        }
    }

    /// Vertices owned by one slot.
    pub fn vertices_per_tile(&self) -> usize {
        self.samples_per_tile * VERTICES_PER_SAMPLE
    }

    /// Indices owned by one presentation position.
    pub fn indices_per_tile(&self) -> usize {
        self.samples_per_tile * INDICES_PER_SAMPLE
    }

    /// First vertex of a slot.
    pub fn vertex_base(&self, slot: usize) -> u32 {
        (slot * self.vertices_per_tile()) as u32
    }

    /// Total vertices in the buffer.
    pub fn vertex_count(&self) -> usize {
        self.capacity * self.vertices_per_tile()
    }

    /// Total indices in the buffer.
    pub fn index_count(&self) -> usize {
        self.capacity * self.indices_per_tile()
    }

    /// Byte offset of a slot within the positions region.
    pub fn position_byte_offset(&self, slot: usize) -> usize {
        slot * self.vertices_per_tile() * size_of::<VertexPosition>()
    }

    /// Byte offset of a slot within the attributes region.
    pub fn attribute_byte_offset(&self, slot: usize) -> usize {
        slot * self.vertices_per_tile() * size_of::<VertexAttributes>()
    }

    /// Byte offset of a presentation position within the index region.
    pub fn index_byte_offset(&self, logical: usize) -> usize {
        logical * self.indices_per_tile() * size_of::<u32>()
    }

    /// Size of a region in bytes.
    pub fn region_bytes(&self, region: BufferRegion) -> usize {
        match region {
            BufferRegion::Positions => self.vertex_count() * size_of::<VertexPosition>(),
            BufferRegion::Attributes => self.vertex_count() * size_of::<VertexAttributes>(),
            BufferRegion::Indices => self.index_count() * size_of::<u32>(),
        }
    }
}

/// Record of a single sub-range upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRecord {
    /// Target region.
    pub region: BufferRegion,
    /// Byte offset within the region.
    pub byte_offset: usize,
    /// Number of bytes written.
    pub len: usize,
}

/// Render buffer kept in host memory.
///
/// Suitable for CPU rasterizers and for inspecting what a GPU buffer would
/// contain. Every upload is logged until [`take_uploads`](Self::take_uploads).
#[derive(Debug, Clone)]
pub struct CpuRenderBuffer {
    layout: BufferLayout,
    positions: Vec<VertexPosition>,
    attributes: Vec<VertexAttributes>,
    indices: Vec<u32>,
    uploads: Vec<UploadRecord>,
    uploaded_bytes: usize,
    draw_range: Option<(u32, u32)>,
}

impl CpuRenderBuffer {
    /// Allocate regions for the given layout.
    pub fn new(layout: BufferLayout) -> Self {
        Self {
            layout,
            positions: vec![[0.0; 2]; layout.vertex_count()],
            attributes: vec![VertexAttributes::zeroed(); layout.vertex_count()],
            indices: vec![0; layout.index_count()],
            uploads: Vec::new(),
            uploaded_bytes: 0,
            draw_range: None,
        }
    }

    /// Buffer layout.
    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[VertexPosition] {
        &self.positions
    }

    /// Vertex attributes.
    pub fn attributes(&self) -> &[VertexAttributes] {
        &self.attributes
    }

    /// Triangle indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Last issued draw range as `(start_index, count)`.
    pub fn draw_range(&self) -> Option<(u32, u32)> {
        self.draw_range
    }

    /// Total bytes uploaded since creation.
    pub fn uploaded_bytes(&self) -> usize {
        self.uploaded_bytes
    }

    /// Uploads logged since the last call.
    pub fn take_uploads(&mut self) -> Vec<UploadRecord> {
        std::mem::take(&mut self.uploads)
    }

    /// Non-degenerate triangles within the last draw range.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let (start, count) = self.draw_range.unwrap_or((0, 0));
        let start = (start as usize).min(self.indices.len());
        let end = (start + count as usize).min(self.indices.len());
        self.indices[start..end]
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .filter(|tri| tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2])
    }

    /// Project the drawn triangles into screen space.
    ///
    /// Triangles touching a break marker are dropped. Line offsets are unit
    /// normals scaled by half the stroke width.
    pub fn screen_triangles(
        &self,
        mode: DrawMode,
        transform: &Transform,
    ) -> Vec<[ScreenPoint; 3]> {
        self.triangles()
            .filter_map(|[a, b, c]| {
                Some([
                    self.screen_vertex(a, mode, transform)?,
                    self.screen_vertex(b, mode, transform)?,
                    self.screen_vertex(c, mode, transform)?,
                ])
            })
            .collect()
    }

    fn screen_vertex(&self, index: u32, mode: DrawMode, transform: &Transform) -> Option<ScreenPoint> {
        let [x, y] = *self.positions.get(index as usize)?;
        let attributes = self.attributes.get(index as usize)?;
        let [dx, dy] = attributes.offset;
        if !dx.is_finite() || !dy.is_finite() {
            return None;
        }
        if !mode.offsets_in_pixels() {
            let point = Point::new(x as f64 + dx as f64, y as f64 + dy as f64);
            return transform.data_to_screen(point);
        }
        let scale = match mode {
            DrawMode::Lines => attributes.stroke_width * 0.5,
            DrawMode::Points | DrawMode::Bars => 1.0,
        };
        let base = transform.data_to_screen(Point::new(x as f64, y as f64))?;
        // Screen Y grows downward.
        Some(ScreenPoint::new(base.x + dx * scale, base.y - dy * scale))
    }
}

impl RenderBuffer for CpuRenderBuffer {
    fn upload_sub_range(&mut self, region: BufferRegion, byte_offset: usize, data: &[u8]) {
        let bytes: &mut [u8] = match region {
            BufferRegion::Positions => bytemuck::cast_slice_mut(&mut self.positions),
            BufferRegion::Attributes => bytemuck::cast_slice_mut(&mut self.attributes),
            BufferRegion::Indices => bytemuck::cast_slice_mut(&mut self.indices),
        };
        let Some(target) = bytes.get_mut(byte_offset..byte_offset + data.len()) else {
            tracing::warn!(
                ?region,
                byte_offset,
                len = data.len(),
                "upload outside of render buffer region ignored"
            );
            return;
        };
        target.copy_from_slice(data);
        self.uploads.push(UploadRecord {
            region,
            byte_offset,
            len: data.len(),
        });
        self.uploaded_bytes += data.len();
    }

    fn issue_draw_range(&mut self, start_index: u32, count: u32) {
        self.draw_range = Some((start_index, count));
    }
}
