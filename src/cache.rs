//! Fixed-capacity, direct-mapped tile cache.
//!
//! Each tile lives in slot `offset mod capacity`. Slots are physical storage
//! and are never reordered; presentation order is computed separately by the
//! buffer synchronizer.

use bitflags::bitflags;

use crate::datasource::{Sample, TileKey, normalize_samples};
use crate::error::TileError;
use crate::mapping::TileWindow;
use crate::render::{VertexAttributes, VertexPosition};

bitflags! {
    /// Derived tile data that is stale relative to its samples.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Vertex positions must be recomputed.
        const POSITION   = 1 << 0;
        /// Presentation indices must be rewritten.
        const INDICES    = 1 << 1;
        /// Vertex attributes (offsets, colors) must be recomputed.
        const ATTRIBUTES = 1 << 2;
    }
}

/// Which logical neighbors a tile's geometry was last joined against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Joins {
    pub(crate) previous: bool,
    pub(crate) next: bool,
}

/// A resident tile and its derived render data.
#[derive(Debug, Clone)]
pub struct Tile {
    key: TileKey,
    samples: Vec<Sample>,
    pub(crate) positions: Vec<VertexPosition>,
    pub(crate) attributes: Vec<VertexAttributes>,
    pub(crate) indices: Vec<u32>,
    pub(crate) dirty: DirtyFlags,
    pub(crate) joins: Option<Joins>,
    pub(crate) presented_at: Option<usize>,
}

impl Tile {
    fn new(key: TileKey, samples: Vec<Sample>) -> Self {
        Self {
            key,
            samples,
            positions: Vec::new(),
            attributes: Vec::new(),
            indices: Vec::new(),
            dirty: DirtyFlags::all(),
            joins: None,
            presented_at: None,
        }
    }

    /// Tile address.
    pub fn key(&self) -> TileKey {
        self.key
    }

    /// Normalized samples in ascending timestamp order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check whether the tile holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First sample, if any.
    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    /// Last sample, if any.
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Current dirty flags.
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// Recentered vertex positions from the last rebuild.
    pub fn positions(&self) -> &[VertexPosition] {
        &self.positions
    }

    /// Vertex attributes from the last rebuild.
    pub fn attributes(&self) -> &[VertexAttributes] {
        &self.attributes
    }

    /// Presentation indices from the last rebuild.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Mark derived data as stale.
    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }
}

/// Tiles to fetch after a visible-window change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    /// Window now current.
    pub window: TileWindow,
    /// Epoch assigned to this window.
    pub epoch: u64,
    /// Whether the level differs from the previous window.
    pub level_changed: bool,
    /// Tiles newly exposed by the change, in ascending offset order.
    pub keys: Vec<TileKey>,
}

/// Result of offering a resolved tile to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The tile was written into its slot.
    Installed {
        /// Slot the tile now occupies.
        slot: usize,
        /// Previous occupant, if any.
        evicted: Option<TileKey>,
    },
    /// The tile is outside the current window.
    Stale,
    /// The slot already holds this exact tile.
    Duplicate,
}

/// Fewest slots a cache may have. Any range that straddles a tile boundary
/// needs two tiles, whatever its span.
pub const MIN_CAPACITY: usize = 2;

/// Direct-mapped store of at most `capacity` tiles.
#[derive(Debug, Clone)]
pub struct TileCache {
    slots: Vec<Option<Tile>>,
    samples_per_tile: usize,
    window: Option<TileWindow>,
    epoch: u64,
}

impl TileCache {
    /// Create an empty cache of at least [`MIN_CAPACITY`] slots.
    pub fn new(capacity: usize, samples_per_tile: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            samples_per_tile,
            window: None,
            epoch: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Maximum samples per tile.
    pub fn samples_per_tile(&self) -> usize {
        self.samples_per_tile
    }

    /// Current window, if one was set.
    pub fn window(&self) -> Option<TileWindow> {
        self.window
    }

    /// Epoch of the current window.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Slot an offset maps to.
    pub fn slot_for(&self, offset: i64) -> usize {
        offset.rem_euclid(self.slots.len() as i64) as usize
    }

    /// Number of occupied slots.
    pub fn resident_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Make `window` current and return the tiles it newly exposes.
    ///
    /// # Panics
    ///
    /// Panics if `window` spans more offsets than the cache has slots; that
    /// indicates a mapper sized for a different capacity.
    pub fn set_window(&mut self, window: TileWindow) -> FetchPlan {
        assert!(
            window.len() <= self.capacity(),
            "tile window {window:?} needs {} tiles but the cache holds {}",
            window.len(),
            self.capacity()
        );

        let previous = self.window.replace(window);
        self.epoch = self.epoch.wrapping_add(1);

        let (level_changed, keys) = match previous {
            Some(old) if old.level == window.level => (false, exposed_keys(old, window)),
            _ => (true, window.keys().collect()),
        };

        FetchPlan {
            window,
            epoch: self.epoch,
            level_changed,
            keys,
        }
    }

    /// Offer a resolved tile for installation.
    ///
    /// Tiles outside the current window and exact duplicates are dropped.
    /// Anything else replaces the slot's occupant.
    pub fn accept(
        &mut self,
        key: TileKey,
        samples: Vec<Sample>,
    ) -> Result<AcceptOutcome, TileError> {
        if !self.window.is_some_and(|window| window.contains(key)) {
            return Ok(AcceptOutcome::Stale);
        }
        let slot = self.slot_for(key.offset);
        if self.slots[slot].as_ref().is_some_and(|tile| tile.key == key) {
            return Ok(AcceptOutcome::Duplicate);
        }
        let samples = normalize_samples(key, samples, self.samples_per_tile)?;
        let evicted = self.slots[slot]
            .replace(Tile::new(key, samples))
            .map(|tile| tile.key);
        Ok(AcceptOutcome::Installed { slot, evicted })
    }

    /// Resident tile with this exact key.
    pub fn get(&self, key: TileKey) -> Option<&Tile> {
        self.slots[self.slot_for(key.offset)]
            .as_ref()
            .filter(|tile| tile.key == key)
    }

    /// Tile occupying a slot.
    pub fn tile_in_slot(&self, slot: usize) -> Option<&Tile> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub(crate) fn tile_in_slot_mut(&mut self, slot: usize) -> Option<&mut Tile> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Slots of tiles belonging to `window`, sorted by ascending offset.
    pub fn active_slots(&self, window: TileWindow) -> Vec<(usize, TileKey)> {
        let mut active: Vec<(usize, TileKey)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, tile)| {
                tile.as_ref()
                    .filter(|tile| window.contains(tile.key))
                    .map(|tile| (slot, tile.key))
            })
            .collect();
        active.sort_by_key(|(_, key)| key.offset);
        active
    }

    /// Tiles belonging to `window`, sorted by ascending offset.
    pub fn active_tiles(&self, window: TileWindow) -> Vec<&Tile> {
        self.active_slots(window)
            .into_iter()
            .filter_map(|(slot, _)| self.tile_in_slot(slot))
            .collect()
    }

    /// Mark every resident tile.
    pub fn mark_all(&mut self, flags: DirtyFlags) {
        for tile in self.slots.iter_mut().flatten() {
            tile.mark_dirty(flags);
        }
    }

    /// Iterate over resident tiles.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.slots.iter().flatten()
    }

    /// Drop every tile and forget the current window.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.window = None;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// Offsets of `new` not covered by `old` at the same level.
///
/// Covers the exposed prefix and the exposed suffix; a window that grows on
/// both sides exposes both.
fn exposed_keys(old: TileWindow, new: TileWindow) -> Vec<TileKey> {
    let mut keys = Vec::new();
    if new.start < old.start {
        keys.extend((new.start..new.end.min(old.start)).map(|o| TileKey::new(new.level, o)));
    }
    if new.end > old.end {
        let from = new.start.max(old.end);
        keys.extend((from..new.end).map(|o| TileKey::new(new.level, o)));
    }
    keys
}
