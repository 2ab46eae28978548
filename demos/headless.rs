//! Scrolls a sparkline across a slow, threaded tile source without a window
//! and prints what each reconciliation pass uploaded.

use std::thread;
use std::time::Duration;

use gpui_tileplot::{
    BufferRegion, CpuRenderBuffer, FetchRequest, PowerOfTwoMapper, Range, RangeMapper, Sample, TileKey,
    TilePlotConfig, TilePlotError, TilePlotter, TileResolver,
};

const BASE_DURATION: f64 = 1.0;

fn synth_tile(mapper: &PowerOfTwoMapper, key: TileKey, samples_per_tile: usize) -> Vec<Sample> {
    let start = mapper.tile_start_time(key.level, key.offset);
    let step = mapper.tile_duration(key.level) / samples_per_tile as f64;
    (0..samples_per_tile)
        .map(|i| {
            let t = start + i as f64 * step;
            let value = (t * 0.7).sin() + 0.3 * (t * 3.1).cos();
            // Every seventh tile has a dropout in the middle.
            let count = if key.offset.rem_euclid(7) == 3 && i % 16 == 8 { 0 } else { 1 };
            Sample::new(t, value, 0.0, count)
        })
        .collect()
}

fn main() -> Result<(), TilePlotError> {
    let config = TilePlotConfig::default().with_samples_per_tile(128);
    let samples_per_tile = config.samples_per_tile;
    let mapper = PowerOfTwoMapper::new(BASE_DURATION, config.capacity);

    let source = move |request: FetchRequest, resolver: TileResolver| {
        thread::spawn(move || {
            let jitter = request.key.offset.rem_euclid(4) as u64 * 5;
            thread::sleep(Duration::from_millis(5 + jitter));
            resolver.resolve(synth_tile(&mapper, request.key, samples_per_tile));
        });
    };

    let mut plotter = TilePlotter::new(config, mapper, source);
    let mut buffer = CpuRenderBuffer::new(plotter.layout());
    let layout = plotter.layout();
    let full_upload: usize = [BufferRegion::Positions, BufferRegion::Attributes, BufferRegion::Indices]
        .into_iter()
        .map(|region| layout.region_bytes(region))
        .sum();

    let steps: usize = std::env::var("STEPS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(12);

    let mut total_bytes = 0;
    for step in 0..steps {
        let start = step as f64 * 0.5;
        plotter.set_visible_range(Range::new(start, start + 2.0))?;

        let mut waited = 0;
        while plotter.missing_tiles() > 0 && waited < 200 {
            plotter.poll_resolved();
            thread::sleep(Duration::from_millis(2));
            waited += 1;
        }
        plotter.poll_resolved();

        let stats = plotter.reconcile(&mut buffer);
        plotter.draw(&mut buffer);
        total_bytes += stats.sync.uploaded_bytes;

        println!(
            "step {:>2}: window {:?} recentered={} pos={} attr={} idx={} bytes={:>6} draw={:?} value@{:.1}={:?}",
            step,
            stats.window.map(|window| (window.level, window.start, window.end)),
            stats.recentered,
            stats.sync.positions_rebuilt,
            stats.sync.attributes_rebuilt,
            stats.sync.indices_rebuilt,
            stats.sync.uploaded_bytes,
            buffer.draw_range(),
            start + 1.0,
            plotter.value_near(start + 1.0, true),
        );
    }

    println!(
        "uploaded {} bytes over {} steps (a full rebuild is roughly {} bytes per step)",
        total_bytes, steps, full_upload
    );
    Ok(())
}
