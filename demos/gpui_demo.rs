#[cfg(feature = "gpui")]
use std::time::Duration;

#[cfg(feature = "gpui")]
use gpui::{
    AppContext, Application, AsyncWindowContext, Bounds, Timer, WindowBounds, WindowOptions, px,
    size,
};

#[cfg(feature = "gpui")]
use gpui_tileplot::gpui_backend::GpuiTilePlotView;
#[cfg(feature = "gpui")]
use gpui_tileplot::{
    FetchRequest, PowerOfTwoMapper, Range, RangeMapper, Sample, TileKey, TilePlotConfig,
    TilePlotter, TileResolver,
};

#[cfg(feature = "gpui")]
const BASE_DURATION: f64 = 1.0;

#[cfg(feature = "gpui")]
fn synth_tile(mapper: &PowerOfTwoMapper, key: TileKey, samples_per_tile: usize) -> Vec<Sample> {
    let start = mapper.tile_start_time(key.level, key.offset);
    let step = mapper.tile_duration(key.level) / samples_per_tile as f64;
    (0..samples_per_tile)
        .map(|i| {
            let t = start + i as f64 * step;
            Sample::point(t, (t * 0.9).sin() + 0.25 * (t * 5.3).sin())
        })
        .collect()
}

#[cfg(feature = "gpui")]
fn main() {
    Application::new().run(|cx| {
        let options = WindowOptions {
            window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                None,
                size(px(900.0), px(300.0)),
                cx,
            ))),
            ..Default::default()
        };

        cx.open_window(options, |window, cx| {
            let config = TilePlotConfig::default().with_samples_per_tile(512);
            let samples_per_tile = config.samples_per_tile;
            let mapper = PowerOfTwoMapper::new(BASE_DURATION, config.capacity);

            // Tiles arrive from worker threads after a simulated round trip.
            let source = move |request: FetchRequest, resolver: TileResolver| {
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(40));
                    resolver.resolve(synth_tile(&mapper, request.key, samples_per_tile));
                });
            };

            let mut plotter = TilePlotter::new(config, mapper, source);
            let _ = plotter.set_visible_range(Range::new(0.0, 8.0));

            let view = GpuiTilePlotView::new(plotter);
            let plotter_handle = view.plotter_handle();
            let view_handle = cx.new(|_| view);

            let view_for_task = view_handle.clone();
            window
                .spawn(cx, move |cx: &mut AsyncWindowContext| {
                    let mut cx = cx.clone();
                    async move {
                        loop {
                            Timer::after(Duration::from_millis(16)).await;
                            cx.update(|_, cx| {
                                view_for_task.update(cx, |_view, view_cx| {
                                    plotter_handle.write(|plotter| {
                                        if let Some(range) = plotter.visible_range() {
                                            let step = range.span() * 0.002;
                                            let _ = plotter.set_visible_range(range.shifted(step));
                                        }
                                    });
                                    view_cx.notify();
                                });
                            })
                            .ok();
                        }
                    }
                })
                .detach();

            view_handle
        })
        .unwrap();
    });
}

#[cfg(not(feature = "gpui"))]
fn main() {
    eprintln!("Enable the gpui feature to run this example.");
}
