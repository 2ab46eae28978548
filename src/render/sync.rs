//! Incremental synchronization of cached tiles into the render buffer.
//!
//! A pass runs in three phases over a frozen snapshot of the active window:
//! plan (collect dirty flags, including neighbor-propagated ones), rebuild and
//! upload, then clear. Flags are only cleared once every tile has been
//! planned, so a neighbor never observes a flag that was cleared mid-pass.

use crate::cache::{DirtyFlags, Joins, TileCache};
use crate::datasource::TileKey;
use crate::datasource::search::lower_bound_by;
use crate::mapping::TileWindow;
use crate::render::geometry::{
    EdgeNeighbors, build_attributes, build_indices, build_positions, degenerate_indices,
    recentered,
};
use crate::render::{BufferLayout, BufferRegion, RenderBuffer};
use crate::style::{DrawMode, TileStyle};

/// Immutable inputs of one synchronization pass.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    /// Active window snapshot.
    pub window: TileWindow,
    /// Recenter offset subtracted from every timestamp.
    pub offset: f64,
    /// Geometry mode.
    pub mode: DrawMode,
    /// Styling.
    pub style: &'a TileStyle,
}

/// Counters describing what a pass touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStats {
    /// Active tiles in the window.
    pub active_tiles: usize,
    /// Tiles whose positions were rebuilt.
    pub positions_rebuilt: usize,
    /// Tiles whose attributes were rebuilt.
    pub attributes_rebuilt: usize,
    /// Tiles whose indices were rewritten.
    pub indices_rebuilt: usize,
    /// Presentation positions that lost their tile.
    pub positions_cleared: usize,
    /// Bytes handed to the render buffer.
    pub uploaded_bytes: usize,
}

impl SyncStats {
    /// Whether the presentation index list changed.
    pub fn indices_changed(&self) -> bool {
        self.indices_rebuilt > 0 || self.positions_cleared > 0
    }
}

/// Logical presentation position of each active tile.
///
/// `active` must be sorted by ascending offset. The lowest-offset tile is
/// position 0; every other tile sits at `(slot - lowest_slot + N) mod N`.
pub fn presentation_order(active: &[(usize, TileKey)], capacity: usize) -> Vec<usize> {
    let Some(&(anchor, _)) = active.first() else {
        return Vec::new();
    };
    active
        .iter()
        .map(|&(slot, _)| (slot + capacity - anchor) % capacity)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct PlannedTile {
    slot: usize,
    key: TileKey,
    logical: usize,
    flags: DirtyFlags,
    joins: Joins,
    neighbors: EdgeNeighbors,
    successor_base: Option<u32>,
}

/// Writes dirty tile data into exact sub-ranges of the render buffer.
#[derive(Debug, Clone)]
pub struct BufferSynchronizer {
    layout: BufferLayout,
    presented: Vec<Option<TileKey>>,
    draw_count: u32,
}

impl BufferSynchronizer {
    /// Create a synchronizer for `layout`.
    pub fn new(layout: BufferLayout) -> Self {
        Self {
            layout,
            presented: vec![None; layout.capacity],
            draw_count: 0,
        }
    }

    /// Buffer layout.
    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    /// Tile presented at each logical position.
    pub fn presented(&self) -> &[Option<TileKey>] {
        &self.presented
    }

    /// Number of indices the next draw call covers.
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    /// Issue a single draw call over every presented tile.
    pub fn draw(&self, buffer: &mut dyn RenderBuffer) {
        buffer.issue_draw_range(0, self.draw_count);
    }

    /// Run one complete pass: plan, rebuild and upload, clear.
    pub fn synchronize(
        &mut self,
        cache: &mut TileCache,
        ctx: PassContext<'_>,
        buffer: &mut dyn RenderBuffer,
    ) -> SyncStats {
        let plan = self.plan(cache, ctx);
        let mut stats = SyncStats {
            active_tiles: plan.len(),
            ..SyncStats::default()
        };

        for planned in &plan {
            self.rebuild(cache, ctx, planned, buffer, &mut stats);
        }
        self.clear_vacated(&plan, buffer, &mut stats);

        for planned in &plan {
            if let Some(tile) = cache.tile_in_slot_mut(planned.slot) {
                tile.dirty = DirtyFlags::empty();
            }
        }

        self.draw_count = plan
            .iter()
            .map(|planned| planned.logical + 1)
            .max()
            .map_or(0, |positions| (positions * self.layout.indices_per_tile()) as u32);

        tracing::trace!(
            active = stats.active_tiles,
            positions = stats.positions_rebuilt,
            attributes = stats.attributes_rebuilt,
            indices = stats.indices_rebuilt,
            cleared = stats.positions_cleared,
            bytes = stats.uploaded_bytes,
            "synchronized render buffer"
        );
        stats
    }

    fn plan(&self, cache: &mut TileCache, ctx: PassContext<'_>) -> Vec<PlannedTile> {
        let active = cache.active_slots(ctx.window);
        let order = presentation_order(&active, cache.capacity());

        // Tiles that left the window lose their presentation; their index
        // region may be reused before they return.
        for slot in 0..cache.capacity() {
            if active.iter().any(|&(active_slot, _)| active_slot == slot) {
                continue;
            }
            if let Some(tile) = cache.tile_in_slot_mut(slot) {
                tile.presented_at = None;
                tile.joins = None;
            }
        }

        let find = |offset: i64| {
            let index = lower_bound_by(&active, |(_, key)| key.offset >= offset);
            active
                .get(index)
                .filter(|(_, key)| key.offset == offset)
                .and_then(|&(slot, _)| cache.tile_in_slot(slot).map(|tile| (slot, tile)))
        };

        let mut plan = Vec::with_capacity(active.len());
        for (&(slot, key), &logical) in active.iter().zip(&order) {
            let Some(tile) = cache.tile_in_slot(slot) else {
                continue;
            };
            let previous = find(key.offset - 1).filter(|(_, tile)| !tile.is_empty());
            let next = find(key.offset + 1).filter(|(_, tile)| !tile.is_empty());

            let joins = Joins {
                previous: previous.is_some(),
                next: next.is_some(),
            };
            let neighbors = EdgeNeighbors {
                previous: previous
                    .and_then(|(_, tile)| tile.last())
                    .map(|sample| recentered(sample, ctx.offset)),
                next: next
                    .and_then(|(_, tile)| tile.first())
                    .map(|sample| recentered(sample, ctx.offset)),
            };

            let mut flags = tile.dirty();
            if tile.joins != Some(joins) {
                flags |= DirtyFlags::ATTRIBUTES | DirtyFlags::INDICES;
            }
            if tile.presented_at != Some(logical) {
                flags |= DirtyFlags::INDICES;
            }
            let neighbor_moved = [previous, next]
                .into_iter()
                .flatten()
                .any(|(_, neighbor)| neighbor.dirty().contains(DirtyFlags::POSITION));
            if neighbor_moved {
                flags |= DirtyFlags::ATTRIBUTES;
            }

            plan.push(PlannedTile {
                slot,
                key,
                logical,
                flags,
                joins,
                neighbors,
                successor_base: next.map(|(slot, _)| self.layout.vertex_base(slot)),
            });
        }
        plan
    }

    fn rebuild(
        &mut self,
        cache: &mut TileCache,
        ctx: PassContext<'_>,
        planned: &PlannedTile,
        buffer: &mut dyn RenderBuffer,
        stats: &mut SyncStats,
    ) {
        let layout = self.layout;
        let Some(tile) = cache.tile_in_slot_mut(planned.slot) else {
            return;
        };

        if planned.flags.contains(DirtyFlags::POSITION) {
            tile.positions = build_positions(tile.samples(), ctx.offset);
            let bytes: &[u8] = bytemuck::cast_slice(&tile.positions);
            buffer.upload_sub_range(
                BufferRegion::Positions,
                layout.position_byte_offset(planned.slot),
                bytes,
            );
            stats.positions_rebuilt += 1;
            stats.uploaded_bytes += bytes.len();
        }

        if planned.flags.contains(DirtyFlags::ATTRIBUTES) {
            tile.attributes = build_attributes(
                ctx.mode,
                ctx.style,
                tile.samples(),
                ctx.offset,
                planned.neighbors,
            );
            let bytes: &[u8] = bytemuck::cast_slice(&tile.attributes);
            buffer.upload_sub_range(
                BufferRegion::Attributes,
                layout.attribute_byte_offset(planned.slot),
                bytes,
            );
            stats.attributes_rebuilt += 1;
            stats.uploaded_bytes += bytes.len();
        }

        if planned.flags.contains(DirtyFlags::INDICES) {
            let successor = if ctx.mode.joins_tiles() {
                planned.successor_base
            } else {
                None
            };
            tile.indices = build_indices(
                ctx.mode,
                tile.len(),
                layout.samples_per_tile,
                layout.vertex_base(planned.slot),
                successor,
            );
            let bytes: &[u8] = bytemuck::cast_slice(&tile.indices);
            buffer.upload_sub_range(
                BufferRegion::Indices,
                layout.index_byte_offset(planned.logical),
                bytes,
            );
            stats.indices_rebuilt += 1;
            stats.uploaded_bytes += bytes.len();
        }

        tile.joins = Some(planned.joins);
        tile.presented_at = Some(planned.logical);
        self.presented[planned.logical] = Some(planned.key);
    }

    fn clear_vacated(
        &mut self,
        plan: &[PlannedTile],
        buffer: &mut dyn RenderBuffer,
        stats: &mut SyncStats,
    ) {
        let layout = self.layout;
        for (logical, presented) in self.presented.iter_mut().enumerate() {
            if presented.is_none() || plan.iter().any(|planned| planned.logical == logical) {
                continue;
            }
            let indices = degenerate_indices(layout.samples_per_tile, 0);
            let bytes: &[u8] = bytemuck::cast_slice(&indices);
            buffer.upload_sub_range(
                BufferRegion::Indices,
                layout.index_byte_offset(logical),
                bytes,
            );
            *presented = None;
            stats.positions_cleared += 1;
            stats.uploaded_bytes += bytes.len();
        }
    }
}
