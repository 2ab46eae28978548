//! gpui_tileplot renders scrolling sparklines from pre-aggregated tiles.
//! Only tiles that changed are rebuilt and uploaded, so panning across long
//! time series costs work proportional to the newly exposed data.

#![forbid(unsafe_code)]

pub mod cache;
pub mod datasource;
pub mod error;
pub mod geom;
pub mod interaction;
pub mod mapping;
pub mod plotter;
pub mod query;
pub mod recenter;
pub mod render;
pub mod style;
pub mod transform;
pub mod view;

#[cfg(feature = "gpui")]
pub mod gpui_backend;

pub use cache::{AcceptOutcome, DirtyFlags, FetchPlan, MIN_CAPACITY, Tile, TileCache};
pub use datasource::{FetchRequest, Sample, TileDataSource, TileKey, TileResolver};
pub use error::{TileError, TilePlotError};
pub use geom::{Point, ScreenPoint, ScreenRect};
pub use interaction::{pan_range, zoom_range};
pub use mapping::{PowerOfTwoMapper, RangeMapper, TileWindow};
pub use plotter::{ReconcileStats, TilePlotConfig, TilePlotter};
pub use query::RangeQueryEngine;
pub use recenter::OffsetRecenterer;
pub use render::sync::{BufferSynchronizer, SyncStats};
pub use render::{
    BufferLayout, BufferRegion, Color, CpuRenderBuffer, RenderBuffer, VertexAttributes,
    VertexPosition,
};
pub use style::{DrawMode, TileStyle};
pub use transform::Transform;
pub use view::{Range, Viewport};
