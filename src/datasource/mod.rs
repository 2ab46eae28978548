//! Tile samples and the asynchronous data-source contract.
//!
//! A [`TileDataSource`] receives one [`FetchRequest`] per missing tile together
//! with a one-shot [`TileResolver`]. Resolutions are delivered over a channel
//! and applied by the plotter on its own thread, so sources are free to
//! resolve from any thread, in any order, or never.

pub mod search;

use std::fmt;

use crossbeam_channel::{Receiver, Sender};

use crate::error::TileError;

/// One pre-aggregated sample of a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Absolute timestamp.
    pub timestamp: f64,
    /// Aggregated value; `NaN` marks a gap.
    pub value: f64,
    /// Standard deviation of the aggregated raw samples.
    pub stdev: f64,
    /// Number of raw samples aggregated into this one.
    pub count: u32,
}

impl Sample {
    /// Create a sample.
    pub fn new(timestamp: f64, value: f64, stdev: f64, count: u32) -> Self {
        Self {
            timestamp,
            value,
            stdev,
            count,
        }
    }

    /// Create a single-count sample with zero deviation.
    pub fn point(timestamp: f64, value: f64) -> Self {
        Self::new(timestamp, value, 0.0, 1)
    }

    /// Check whether the sample carries real data.
    pub fn is_real(&self) -> bool {
        self.count > 0 && self.value.is_finite()
    }
}

/// Address of a tile: resolution level and offset along the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileKey {
    /// Resolution tier; higher is coarser.
    pub level: i32,
    /// Position along the timeline in tile durations.
    pub offset: i64,
}

impl TileKey {
    /// Create a tile key.
    pub fn new(level: i32, offset: i64) -> Self {
        Self { level, offset }
    }

    /// Key of the logically adjacent tile at `delta` offsets away.
    pub fn neighbor(self, delta: i64) -> Self {
        Self {
            level: self.level,
            offset: self.offset + delta,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}@{}", self.level, self.offset)
    }
}

/// A fetch dispatched for a missing tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// Tile to fetch.
    pub key: TileKey,
    /// Visible-range epoch the request was issued in.
    pub epoch: u64,
}

/// A tile resolution travelling back to the plotter.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Request this resolution answers.
    pub request: FetchRequest,
    /// Raw samples in ascending timestamp order.
    pub samples: Vec<Sample>,
}

/// One-shot completion handle for a [`FetchRequest`].
///
/// Resolving consumes the handle, so a request resolves at most once.
/// Dropping it without resolving is allowed; the tile is simply never
/// installed.
#[derive(Debug)]
pub struct TileResolver {
    request: FetchRequest,
    sender: Sender<Resolution>,
}

impl TileResolver {
    pub(crate) fn new(request: FetchRequest, sender: Sender<Resolution>) -> Self {
        Self { request, sender }
    }

    /// Request this resolver answers.
    pub fn request(&self) -> FetchRequest {
        self.request
    }

    /// Deliver the tile's samples.
    pub fn resolve(self, samples: Vec<Sample>) {
        let resolution = Resolution {
            request: self.request,
            samples,
        };
        if self.sender.send(resolution).is_err() {
            tracing::trace!(key = %self.request.key, "plotter dropped before tile resolved");
        }
    }
}

/// Asynchronous provider of tile samples.
pub trait TileDataSource {
    /// Start fetching a tile. Must not block on completion.
    fn request(&mut self, request: FetchRequest, resolver: TileResolver);
}

impl<F> TileDataSource for F
where
    F: FnMut(FetchRequest, TileResolver),
{
    fn request(&mut self, request: FetchRequest, resolver: TileResolver) {
        self(request, resolver)
    }
}

/// Channel pair carrying resolutions from sources to the plotter.
pub(crate) fn resolution_channel() -> (Sender<Resolution>, Receiver<Resolution>) {
    crossbeam_channel::unbounded()
}

/// Normalize raw samples for installation into a tile.
///
/// Zero-count samples keep their slot but get a `NaN` value so they render
/// as gaps. Samples beyond `max_len` are dropped.
pub fn normalize_samples(
    key: TileKey,
    mut samples: Vec<Sample>,
    max_len: usize,
) -> Result<Vec<Sample>, TileError> {
    if samples.len() > max_len {
        tracing::warn!(
            %key,
            len = samples.len(),
            max_len,
            "tile has more samples than a slot holds; truncating"
        );
        samples.truncate(max_len);
    }
    if let Some(index) = samples
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
    {
        return Err(TileError::NonMonotonic {
            key,
            index: index + 1,
        });
    }
    for sample in &mut samples {
        if sample.count == 0 {
            sample.value = f64::NAN;
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_samples_become_gaps() {
        let key = TileKey::new(0, 0);
        let samples = vec![
            Sample::new(0.0, 1.0, 0.0, 3),
            Sample::new(1.0, 2.0, 0.0, 0),
            Sample::new(2.0, 3.0, 0.0, 1),
        ];
        let normalized = normalize_samples(key, samples, 16).unwrap();
        assert_eq!(normalized.len(), 3);
        assert!(normalized[1].value.is_nan());
        assert!(!normalized[1].is_real());
        assert_eq!(normalized[2].value, 3.0);
    }

    #[test]
    fn non_monotonic_samples_are_rejected() {
        let key = TileKey::new(2, 7);
        let samples = vec![Sample::point(1.0, 0.0), Sample::point(0.5, 0.0)];
        let err = normalize_samples(key, samples, 16).unwrap_err();
        assert_eq!(err, TileError::NonMonotonic { key, index: 1 });
    }

    #[test]
    fn oversized_tiles_are_truncated() {
        let key = TileKey::new(0, 0);
        let samples = (0..10).map(|i| Sample::point(i as f64, 0.0)).collect();
        let normalized = normalize_samples(key, samples, 4).unwrap();
        assert_eq!(normalized.len(), 4);
        assert_eq!(normalized[3].timestamp, 3.0);
    }

    #[test]
    fn resolver_delivers_once_over_channel() {
        let (sender, receiver) = resolution_channel();
        let request = FetchRequest {
            key: TileKey::new(1, 4),
            epoch: 9,
        };
        let resolver = TileResolver::new(request, sender);
        assert_eq!(resolver.request(), request);
        resolver.resolve(vec![Sample::point(0.0, 1.0)]);
        let resolution = receiver.try_recv().unwrap();
        assert_eq!(resolution.request, request);
        assert_eq!(resolution.samples.len(), 1);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn tile_key_display_and_neighbors() {
        let key = TileKey::new(3, -2);
        assert_eq!(key.to_string(), "L3@-2");
        assert_eq!(key.neighbor(1), TileKey::new(3, -1));
    }
}
