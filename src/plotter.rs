//! Tile plotter entry point.
//!
//! [`TilePlotter`] owns the tile cache and drives the whole pipeline: visible
//! range changes dispatch fetches, resolutions are installed as they arrive,
//! and [`reconcile`](TilePlotter::reconcile) brings a render buffer up to
//! date with a single pass.

use std::fmt;

use crossbeam_channel::{Receiver, Sender};

use crate::cache::{AcceptOutcome, DirtyFlags, FetchPlan, MIN_CAPACITY, TileCache};
use crate::datasource::{
    FetchRequest, Resolution, Sample, TileDataSource, TileKey, TileResolver, resolution_channel,
};
use crate::error::{TileError, TilePlotError};
use crate::mapping::{RangeMapper, TileWindow};
use crate::query::RangeQueryEngine;
use crate::recenter::OffsetRecenterer;
use crate::render::sync::{BufferSynchronizer, PassContext, SyncStats};
use crate::render::{BufferLayout, RenderBuffer};
use crate::style::{DrawMode, TileStyle};
use crate::view::Range;

/// Plotter configuration.
///
/// `capacity` must match the capacity the [`RangeMapper`] sizes its windows
/// for.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TilePlotConfig {
    /// Number of cache slots.
    pub capacity: usize,
    /// Maximum samples per tile.
    pub samples_per_tile: usize,
    /// Geometry mode.
    pub draw_mode: DrawMode,
    /// Styling.
    pub style: TileStyle,
}

impl Default for TilePlotConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            samples_per_tile: 256,
            draw_mode: DrawMode::default(),
            style: TileStyle::default(),
        }
    }
}

impl TilePlotConfig {
    /// Set the number of cache slots, at least [`MIN_CAPACITY`].
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(MIN_CAPACITY);
        self
    }

    /// Set the maximum samples per tile.
    pub fn with_samples_per_tile(mut self, samples_per_tile: usize) -> Self {
        self.samples_per_tile = samples_per_tile;
        self
    }

    /// Set the draw mode.
    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = draw_mode;
        self
    }

    /// Set the style.
    pub fn with_style(mut self, style: TileStyle) -> Self {
        self.style = style;
        self
    }

    /// Render buffer layout implied by this configuration.
    pub fn layout(&self) -> BufferLayout {
        BufferLayout::new(self.capacity.max(MIN_CAPACITY), self.samples_per_tile)
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReconcileStats {
    /// Window the pass ran against.
    pub window: Option<TileWindow>,
    /// Whether the recenter offset moved.
    pub recentered: bool,
    /// Whether the query index was rebuilt.
    pub query_refreshed: bool,
    /// Buffer synchronization counters.
    pub sync: SyncStats,
}

type DataChanged = Box<dyn FnMut() + Send>;

/// Tile cache and incremental render-buffer synchronization for one channel.
pub struct TilePlotter {
    config: TilePlotConfig,
    mapper: Box<dyn RangeMapper + Send>,
    source: Box<dyn TileDataSource + Send>,
    cache: TileCache,
    recenter: OffsetRecenterer,
    sync: BufferSynchronizer,
    query: RangeQueryEngine,
    visible: Option<Range>,
    sender: Sender<Resolution>,
    receiver: Receiver<Resolution>,
    on_data_changed: Option<DataChanged>,
    generation: u64,
}

impl fmt::Debug for TilePlotter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TilePlotter")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("recenter", &self.recenter)
            .field("visible", &self.visible)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl TilePlotter {
    /// Create a plotter.
    pub fn new(
        config: TilePlotConfig,
        mapper: impl RangeMapper + Send + 'static,
        source: impl TileDataSource + Send + 'static,
    ) -> Self {
        let layout = config.layout();
        let (sender, receiver) = resolution_channel();
        Self {
            config,
            mapper: Box::new(mapper),
            source: Box::new(source),
            cache: TileCache::new(layout.capacity, layout.samples_per_tile),
            recenter: OffsetRecenterer::new(),
            sync: BufferSynchronizer::new(layout),
            query: RangeQueryEngine::new(),
            visible: None,
            sender,
            receiver,
            on_data_changed: None,
            generation: 0,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &TilePlotConfig {
        &self.config
    }

    /// Render buffer layout the backend must allocate.
    pub fn layout(&self) -> BufferLayout {
        self.sync.layout()
    }

    /// Tile cache.
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Current visible range.
    pub fn visible_range(&self) -> Option<Range> {
        self.visible
    }

    /// Current tile window.
    pub fn window(&self) -> Option<TileWindow> {
        self.cache.window()
    }

    /// Tiles of the current window that are not resident yet.
    pub fn missing_tiles(&self) -> usize {
        self.cache.window().map_or(0, |window| {
            window.len().saturating_sub(self.cache.active_slots(window).len())
        })
    }

    /// Offset subtracted from timestamps in the render buffer.
    pub fn recenter_offset(&self) -> f64 {
        self.recenter.offset()
    }

    /// Counter bumped whenever cached data changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Register the callback fired whenever cached data changes.
    ///
    /// The callback should schedule a redraw; it must not reconcile
    /// synchronously.
    pub fn set_on_data_changed(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_data_changed = Some(Box::new(callback));
    }

    /// Change the visible time range and fetch the tiles it newly exposes.
    ///
    /// # Panics
    ///
    /// Panics if the mapper yields a window wider than the cache capacity.
    pub fn set_visible_range(&mut self, range: Range) -> Result<FetchPlan, TilePlotError> {
        if !range.is_valid() {
            return Err(TilePlotError::InvalidRange {
                min: range.min,
                max: range.max,
            });
        }
        let window = self.mapper.window_for(range);
        let plan = self.cache.set_window(window);
        self.visible = Some(range);

        for &key in &plan.keys {
            let request = FetchRequest {
                key,
                epoch: plan.epoch,
            };
            tracing::debug!(%key, epoch = plan.epoch, "dispatching tile fetch");
            self.source
                .request(request, TileResolver::new(request, self.sender.clone()));
        }
        Ok(plan)
    }

    /// Install every resolution that has arrived. Returns the number of
    /// tiles installed.
    pub fn poll_resolved(&mut self) -> usize {
        let mut installed = 0;
        while let Ok(resolution) = self.receiver.try_recv() {
            let key = resolution.request.key;
            match self.apply(resolution.request, resolution.samples) {
                Ok(AcceptOutcome::Installed { .. }) => installed += 1,
                Ok(_) => {}
                Err(err) => tracing::warn!(%key, %err, "rejected resolved tile"),
            }
        }
        installed
    }

    /// Install a tile directly, bypassing the resolution channel.
    pub fn resolve_tile(
        &mut self,
        key: TileKey,
        samples: Vec<Sample>,
    ) -> Result<AcceptOutcome, TilePlotError> {
        let request = FetchRequest {
            key,
            epoch: self.cache.epoch(),
        };
        self.apply(request, samples).map_err(TilePlotError::from)
    }

    fn apply(
        &mut self,
        request: FetchRequest,
        samples: Vec<Sample>,
    ) -> Result<AcceptOutcome, TileError> {
        let key = request.key;
        let outcome = self.cache.accept(key, samples)?;
        match outcome {
            AcceptOutcome::Installed { slot, evicted } => {
                tracing::debug!(
                    %key,
                    slot,
                    evicted = ?evicted,
                    epoch = request.epoch,
                    "installed tile"
                );
                self.data_changed();
            }
            AcceptOutcome::Stale => {
                tracing::trace!(
                    %key,
                    epoch = request.epoch,
                    current = self.cache.epoch(),
                    "discarded stale tile"
                );
            }
            AcceptOutcome::Duplicate => {
                tracing::trace!(%key, "discarded duplicate tile");
            }
        }
        Ok(outcome)
    }

    /// Change the draw mode. Rebuilds attributes and indices on the next pass.
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        if self.config.draw_mode == mode {
            return;
        }
        self.config.draw_mode = mode;
        self.cache.mark_all(DirtyFlags::ATTRIBUTES | DirtyFlags::INDICES);
        self.data_changed();
    }

    /// Change the style. Rebuilds attributes on the next pass.
    pub fn set_style(&mut self, style: TileStyle) {
        if self.config.style == style {
            return;
        }
        self.config.style = style;
        self.cache.mark_all(DirtyFlags::ATTRIBUTES);
        self.data_changed();
    }

    fn data_changed(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(callback) = self.on_data_changed.as_mut() {
            callback();
        }
    }

    /// Bring `buffer` up to date with the cache in one complete pass.
    ///
    /// Recenters if needed, rebuilds and uploads only stale tile data, then
    /// refreshes the query index when the presented tiles changed.
    pub fn reconcile(&mut self, buffer: &mut impl RenderBuffer) -> ReconcileStats {
        let (Some(window), Some(visible)) = (self.cache.window(), self.visible) else {
            return ReconcileStats::default();
        };

        let offsets: Vec<i64> = self
            .cache
            .active_slots(window)
            .into_iter()
            .map(|(_, key)| key.offset)
            .collect();
        let recentered = self
            .recenter
            .update(self.mapper.as_ref(), window, visible, offsets);
        if recentered {
            self.cache.mark_all(DirtyFlags::POSITION | DirtyFlags::ATTRIBUTES);
        }

        let ctx = PassContext {
            window,
            offset: self.recenter.offset(),
            mode: self.config.draw_mode,
            style: &self.config.style,
        };
        let sync = self.sync.synchronize(&mut self.cache, ctx, buffer);

        let query_refreshed = sync.indices_changed();
        if query_refreshed {
            self.query.rebuild(self.cache.active_tiles(window));
        }

        ReconcileStats {
            window: Some(window),
            recentered,
            query_refreshed,
            sync,
        }
    }

    /// Issue the single draw call covering every presented tile.
    pub fn draw(&self, buffer: &mut impl RenderBuffer) {
        self.sync.draw(buffer);
    }

    /// Query index over the presented tiles.
    pub fn query(&self) -> &RangeQueryEngine {
        &self.query
    }

    /// Value at time `t`; see [`RangeQueryEngine::value_near`].
    pub fn value_near(&self, t: f64, interpolate: bool) -> Option<f64> {
        self.query.value_near(t, interpolate)
    }

    /// Value extent within `range`; see [`RangeQueryEngine::min_max_in_range`].
    pub fn min_max_in_range(&self, range: Range) -> Range {
        self.query.min_max_in_range(range)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::mapping::PowerOfTwoMapper;
    use crate::recenter::precision_limit;
    use crate::render::{BufferRegion, CpuRenderBuffer, UploadRecord};

    /// Mapper pinned to one level with tiles of `duration`.
    #[derive(Debug, Clone, Copy)]
    struct FixedMapper {
        level: i32,
        duration: f64,
    }

    impl RangeMapper for FixedMapper {
        fn level_for(&self, _range: Range) -> i32 {
            self.level
        }

        fn offset_for(&self, time: f64, _level: i32) -> i64 {
            (time / self.duration).floor() as i64
        }

        fn tile_start_time(&self, _level: i32, offset: i64) -> f64 {
            offset as f64 * self.duration
        }
    }

    type Pending = Arc<Mutex<Vec<TileResolver>>>;

    fn plotter(
        config: TilePlotConfig,
        mapper: impl RangeMapper + Send + 'static,
    ) -> (TilePlotter, Pending) {
        let pending: Pending = Arc::default();
        let sink = Arc::clone(&pending);
        let source = move |_request: FetchRequest, resolver: TileResolver| {
            sink.lock().unwrap().push(resolver);
        };
        (TilePlotter::new(config, mapper, source), pending)
    }

    fn fixed(duration: f64) -> FixedMapper {
        FixedMapper { level: 0, duration }
    }

    fn small_config() -> TilePlotConfig {
        TilePlotConfig::default().with_samples_per_tile(4)
    }

    fn requested(pending: &Pending) -> Vec<i64> {
        pending
            .lock()
            .unwrap()
            .iter()
            .map(|resolver| resolver.request().key.offset)
            .collect()
    }

    fn resolve(pending: &Pending, offset: i64, samples: Vec<Sample>) {
        let mut pending = pending.lock().unwrap();
        let index = pending
            .iter()
            .position(|resolver| resolver.request().key.offset == offset)
            .unwrap();
        pending.remove(index).resolve(samples);
    }

    /// Two samples inside tile `offset` of duration 10.
    fn tile_samples(offset: i64) -> Vec<Sample> {
        let start = offset as f64 * 10.0;
        vec![
            Sample::point(start, offset as f64),
            Sample::point(start + 5.0, offset as f64 + 0.5),
        ]
    }

    fn regions(uploads: &[UploadRecord], region: BufferRegion) -> Vec<usize> {
        let mut offsets: Vec<usize> = uploads
            .iter()
            .filter(|upload| upload.region == region)
            .map(|upload| upload.byte_offset)
            .collect();
        offsets.sort_unstable();
        offsets
    }

    #[test]
    fn requests_never_exceed_capacity() {
        let mapper = PowerOfTwoMapper::new(1.0, 3);
        let (mut plotter, pending) = plotter(TilePlotConfig::default(), mapper);
        let ranges = [
            (0.0, 2.0),
            (0.3, 1.9),
            (1.0, 6.0),
            (-7.5, 3.0),
            (100.0, 100.001),
            (1.0e6, 1.0e6 + 12_345.0),
            (-1.0e9, 1.0e9),
        ];
        for (min, max) in ranges {
            pending.lock().unwrap().clear();
            let plan = plotter.set_visible_range(Range::new(min, max)).unwrap();
            assert!(plan.window.len() <= 3, "window {:?}", plan.window);
            assert!(plan.keys.len() <= 3);
            assert_eq!(pending.lock().unwrap().len(), plan.keys.len());
        }
    }

    #[test]
    fn same_range_twice_fetches_nothing_new() {
        let (mut plotter, pending) = plotter(small_config(), fixed(10.0));
        let range = Range::new(50.0, 79.0);
        plotter.set_visible_range(range).unwrap();
        assert_eq!(requested(&pending), vec![5, 6, 7]);
        let plan = plotter.set_visible_range(range).unwrap();
        assert!(plan.keys.is_empty());
        assert_eq!(pending.lock().unwrap().len(), 3);
    }

    #[test]
    fn sliding_by_one_tile_fetches_one_tile() {
        let (mut plotter, pending) = plotter(small_config(), fixed(10.0));
        plotter.set_visible_range(Range::new(50.0, 79.0)).unwrap();
        pending.lock().unwrap().clear();
        let plan = plotter.set_visible_range(Range::new(60.0, 89.0)).unwrap();
        assert_eq!(plan.window, TileWindow::new(0, 6, 9));
        assert_eq!(requested(&pending), vec![8]);
    }

    #[test]
    fn level_change_fetches_every_tile() {
        let mapper = PowerOfTwoMapper::new(1.0, 3);
        let (mut plotter, pending) = plotter(TilePlotConfig::default(), mapper);
        let first = plotter.set_visible_range(Range::new(0.0, 2.0)).unwrap();
        assert_eq!(first.window, TileWindow::new(0, 0, 3));
        pending.lock().unwrap().clear();

        let second = plotter.set_visible_range(Range::new(0.0, 4.0)).unwrap();
        assert!(second.level_changed);
        assert_eq!(second.window, TileWindow::new(1, 0, 3));
        let keys: Vec<TileKey> = pending
            .lock()
            .unwrap()
            .iter()
            .map(|resolver| resolver.request().key)
            .collect();
        assert_eq!(
            keys,
            vec![TileKey::new(1, 0), TileKey::new(1, 1), TileKey::new(1, 2)]
        );
    }

    #[test]
    fn stale_resolution_leaves_cache_untouched() {
        let (mut plotter, pending) = plotter(small_config(), fixed(10.0));
        plotter.set_visible_range(Range::new(30.0, 59.0)).unwrap();
        plotter.set_visible_range(Range::new(100.0, 129.0)).unwrap();
        resolve(&pending, 5, tile_samples(5));

        assert_eq!(plotter.poll_resolved(), 0);
        assert_eq!(plotter.cache().resident_count(), 0);
        assert!(plotter.cache().tile_in_slot(plotter.cache().slot_for(5)).is_none());
        assert_eq!(plotter.generation(), 0);
    }

    #[test]
    fn resolutions_install_and_notify() {
        let (mut plotter, pending) = plotter(small_config(), fixed(10.0));
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        plotter.set_on_data_changed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        plotter.set_visible_range(Range::new(50.0, 79.0)).unwrap();
        resolve(&pending, 6, tile_samples(6));
        resolve(&pending, 5, tile_samples(5));
        assert_eq!(plotter.poll_resolved(), 2);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
        assert_eq!(plotter.generation(), 2);

        let duplicate = plotter.resolve_tile(TileKey::new(0, 5), tile_samples(5)).unwrap();
        assert_eq!(duplicate, AcceptOutcome::Duplicate);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn non_monotonic_tiles_are_rejected() {
        let (mut plotter, _pending) = plotter(small_config(), fixed(10.0));
        plotter.set_visible_range(Range::new(50.0, 79.0)).unwrap();
        let key = TileKey::new(0, 6);
        let samples = vec![Sample::point(65.0, 0.0), Sample::point(61.0, 0.0)];
        let err = plotter.resolve_tile(key, samples).unwrap_err();
        assert_eq!(
            err,
            TilePlotError::Tile(TileError::NonMonotonic { key, index: 1 })
        );
        assert!(plotter.cache().get(key).is_none());
    }

    #[test]
    fn invalid_visible_range_is_an_error() {
        let (mut plotter, pending) = plotter(small_config(), fixed(10.0));
        let err = plotter
            .set_visible_range(Range::new(f64::NAN, 1.0))
            .unwrap_err();
        assert!(matches!(err, TilePlotError::InvalidRange { .. }));
        assert!(plotter.set_visible_range(Range::new(3.0, 3.0)).is_err());
        assert!(pending.lock().unwrap().is_empty());
        assert!(plotter.window().is_none());
    }

    #[test]
    fn missing_middle_tile_breaks_the_line() {
        let config = small_config();
        let layout = config.layout();
        let (mut plotter, pending) = plotter(config, fixed(10.0));
        let mut buffer = CpuRenderBuffer::new(layout);

        plotter.set_visible_range(Range::new(70.0, 99.0)).unwrap();
        resolve(&pending, 7, tile_samples(7));
        resolve(&pending, 9, tile_samples(9));
        plotter.poll_resolved();
        let stats = plotter.reconcile(&mut buffer);
        plotter.draw(&mut buffer);
        assert_eq!(stats.sync.active_tiles, 2);

        // Offset 7 sits in slot 1 (vertices 16..32), offset 9 in slot 0.
        let last_of_seven = 16 + 4;
        assert!(buffer.attributes()[last_of_seven + 2].offset[0].is_nan());
        assert!(buffer.attributes()[last_of_seven + 3].offset[1].is_nan());
        assert!(buffer.attributes()[0].offset[0].is_nan());
        assert_eq!(&buffer.indices()[6..12], &[20; 6]);

        // 9 is presented at logical position 2, behind the gap at 1.
        assert_eq!(buffer.draw_range(), Some((0, 72)));
        let crosses_seam = buffer.triangles().any(|tri| {
            tri.iter().any(|&v| (16..32).contains(&v)) && tri.iter().any(|&v| v < 16)
        });
        assert!(!crosses_seam);
        assert!(buffer.triangles().count() > 0);

        // Once 8 arrives, the seams join through its slot.
        resolve(&pending, 8, tile_samples(8));
        plotter.poll_resolved();
        let stats = plotter.reconcile(&mut buffer);
        assert_eq!(stats.sync.positions_rebuilt, 1);
        assert_eq!(&buffer.indices()[6..12], &[22, 23, 32, 32, 23, 33]);
        assert_eq!(&buffer.indices()[30..36], &[38, 39, 0, 0, 39, 1]);
        assert!(buffer.attributes()[last_of_seven + 2].offset[0].is_finite());
        assert!(buffer.attributes()[0].offset[0].is_finite());
    }

    #[test]
    fn reconcile_uploads_only_changed_tiles() {
        let config = small_config();
        let layout = config.layout();
        let (mut plotter, pending) = plotter(config, fixed(10.0));
        let mut buffer = CpuRenderBuffer::new(layout);

        plotter.set_visible_range(Range::new(50.0, 79.0)).unwrap();
        resolve(&pending, 5, tile_samples(5));
        resolve(&pending, 6, tile_samples(6));
        plotter.poll_resolved();
        plotter.reconcile(&mut buffer);
        buffer.take_uploads();

        // Offset 7 lands in slot 1; 6 (slot 0) is its neighbor; 5 (slot 2)
        // is unaffected.
        resolve(&pending, 7, tile_samples(7));
        plotter.poll_resolved();
        let stats = plotter.reconcile(&mut buffer);
        let uploads = buffer.take_uploads();

        assert!(!stats.recentered);
        assert_eq!(
            regions(&uploads, BufferRegion::Positions),
            vec![layout.position_byte_offset(1)]
        );
        assert_eq!(
            regions(&uploads, BufferRegion::Attributes),
            vec![layout.attribute_byte_offset(0), layout.attribute_byte_offset(1)]
        );
        assert_eq!(
            regions(&uploads, BufferRegion::Indices),
            vec![layout.index_byte_offset(1), layout.index_byte_offset(2)]
        );

        let stats = plotter.reconcile(&mut buffer);
        assert_eq!(stats.sync.uploaded_bytes, 0);
        assert!(buffer.take_uploads().is_empty());
        assert!(!stats.query_refreshed);
    }

    #[test]
    fn distant_pan_keeps_positions_precise() {
        let config = small_config();
        let layout = config.layout();
        let mapper = fixed(1.0);
        let (mut plotter, pending) = plotter(config, mapper);
        let mut buffer = CpuRenderBuffer::new(layout);

        plotter.set_visible_range(Range::new(0.0, 2.5)).unwrap();
        for offset in 0..3 {
            resolve(&pending, offset, vec![Sample::point(offset as f64 + 0.5, 1.0)]);
        }
        plotter.poll_resolved();
        let first = plotter.reconcile(&mut buffer);
        assert!(first.recentered);
        assert_eq!(plotter.recenter_offset(), 1.25);

        let far = (1_i64 << 25) as f64;
        plotter.set_visible_range(Range::new(far, far + 2.5)).unwrap();
        let base = far as i64;
        for offset in base..base + 3 {
            resolve(&pending, offset, vec![Sample::point(offset as f64 + 0.5, 1.0)]);
        }
        plotter.poll_resolved();
        let second = plotter.reconcile(&mut buffer);
        assert!(second.recentered);
        assert_eq!(second.sync.positions_rebuilt, 3);

        let window = plotter.window().unwrap();
        let limit = precision_limit(&mapper, window.level);
        for tile in plotter.cache().active_tiles(window) {
            let key = tile.key();
            let start = mapper.tile_start_time(key.level, key.offset);
            let end = mapper.tile_end_time(key.level, key.offset);
            let offset = plotter.recenter_offset();
            assert!((offset - start).abs().max((offset - end).abs()) <= limit);
        }
        let slot = plotter.cache().slot_for(base);
        let position = buffer.positions()[layout.vertex_base(slot) as usize];
        assert_eq!(position, [-0.75, 1.0]);
    }

    #[test]
    fn idle_passes_with_coarse_tiles_upload_nothing() {
        let config = small_config();
        let layout = config.layout();
        let mapper = PowerOfTwoMapper::new(1.0e7, 3);
        let (mut plotter, pending) = plotter(config, mapper);
        let mut buffer = CpuRenderBuffer::new(layout);

        let plan = plotter.set_visible_range(Range::new(0.0, 2.0e7)).unwrap();
        for key in plan.keys {
            let start = mapper.tile_start_time(key.level, key.offset);
            resolve(&pending, key.offset, vec![Sample::point(start, 1.0)]);
        }
        plotter.poll_resolved();
        let first = plotter.reconcile(&mut buffer);
        assert!(first.recentered);
        assert_eq!(first.sync.positions_rebuilt, 3);

        for _ in 0..2 {
            let idle = plotter.reconcile(&mut buffer);
            assert!(!idle.recentered);
            assert_eq!(idle.sync.uploaded_bytes, 0);
        }
    }

    #[test]
    fn draw_mode_change_rebuilds_attributes_only() {
        let config = small_config();
        let layout = config.layout();
        let (mut plotter, pending) = plotter(config, fixed(10.0));
        let mut buffer = CpuRenderBuffer::new(layout);

        plotter.set_visible_range(Range::new(50.0, 79.0)).unwrap();
        for offset in 5..8 {
            resolve(&pending, offset, tile_samples(offset));
        }
        plotter.poll_resolved();
        plotter.reconcile(&mut buffer);

        let generation = plotter.generation();
        plotter.set_draw_mode(DrawMode::Points);
        assert_eq!(plotter.generation(), generation + 1);
        plotter.set_draw_mode(DrawMode::Points);
        assert_eq!(plotter.generation(), generation + 1);

        let stats = plotter.reconcile(&mut buffer);
        assert_eq!(stats.sync.positions_rebuilt, 0);
        assert_eq!(stats.sync.attributes_rebuilt, 3);
        assert_eq!(stats.sync.indices_rebuilt, 3);
        assert_eq!(buffer.attributes()[0].offset, [-2.0, -2.0]);
    }

    #[test]
    fn queries_follow_presented_tiles() {
        let config = small_config();
        let layout = config.layout();
        let (mut plotter, pending) = plotter(config, fixed(10.0));
        let mut buffer = CpuRenderBuffer::new(layout);

        plotter.set_visible_range(Range::new(50.0, 79.0)).unwrap();
        assert_eq!(plotter.value_near(55.0, false), None);
        assert_eq!(plotter.missing_tiles(), 3);
        for offset in 5..8 {
            resolve(&pending, offset, tile_samples(offset));
        }
        plotter.poll_resolved();
        assert_eq!(plotter.missing_tiles(), 0);
        let stats = plotter.reconcile(&mut buffer);
        assert!(stats.query_refreshed);

        assert_eq!(plotter.query().len(), 6);
        assert_eq!(plotter.value_near(61.0, false), Some(6.0));
        let blended = plotter.value_near(67.5, true).unwrap();
        assert!((blended - 6.75).abs() < 1e-12);
        assert_eq!(
            plotter.min_max_in_range(Range::new(50.0, 79.0)),
            Range::new(5.0, 7.5)
        );
        assert_eq!(
            plotter.min_max_in_range(Range::new(200.0, 300.0)),
            Range::new(-1.0, 1.0)
        );
    }

    #[test]
    fn config_builders_and_defaults() {
        let config = TilePlotConfig::default();
        assert_eq!(config.capacity, 3);
        assert_eq!(config.samples_per_tile, 256);
        assert_eq!(config.draw_mode, DrawMode::Lines);
        let config = config
            .with_capacity(0)
            .with_samples_per_tile(8)
            .with_draw_mode(DrawMode::Bars);
        assert_eq!(config.capacity, 2);
        assert_eq!(config.layout(), BufferLayout::new(2, 8));

        let raw = TilePlotConfig {
            capacity: 1,
            ..TilePlotConfig::default()
        };
        assert_eq!(raw.layout().capacity, 2);
    }

    #[test]
    fn single_slot_request_holds_a_boundary_crossing_range() {
        let config = TilePlotConfig::default().with_capacity(1);
        let mapper = PowerOfTwoMapper::new(1.0, 1);
        let (mut plotter, pending) = plotter(config, mapper);
        assert_eq!(plotter.cache().capacity(), 2);

        let plan = plotter.set_visible_range(Range::new(0.5, 1.5)).unwrap();
        assert_eq!(plan.window, TileWindow::new(0, 0, 2));
        assert_eq!(requested(&pending), vec![0, 1]);
    }
}
