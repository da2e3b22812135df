//! Lock-screen metadata projection.

use crate::rate::PlaybackRate;
use bridge_traits::{NowPlayingCenter, NowPlayingInfo};
use core_library::Episode;
use std::sync::Arc;
use std::time::Duration;

/// Publishes [`NowPlayingInfo`] to the host center and keeps the last value
/// for UI polling.
pub struct NowPlayingProjector {
    center: Arc<dyn NowPlayingCenter>,
    last: Option<NowPlayingInfo>,
}

impl NowPlayingProjector {
    pub fn new(center: Arc<dyn NowPlayingCenter>) -> Self {
        Self { center, last: None }
    }

    /// Metadata for `episode`; `None` clears the surface.
    ///
    /// An indefinite duration is reported as zero.
    pub fn project(
        episode: Option<&Episode>,
        rate: PlaybackRate,
        elapsed: Duration,
        duration: Option<Duration>,
    ) -> Option<NowPlayingInfo> {
        let episode = episode?;
        Some(NowPlayingInfo {
            title: episode.title.clone(),
            artist: episode.series_title.clone(),
            album: episode.series_title.clone(),
            playback_rate: rate.as_f32(),
            elapsed_seconds: elapsed.as_secs_f64(),
            duration_seconds: duration.map_or(0.0, |d| d.as_secs_f64()),
        })
    }

    pub fn refresh(
        &mut self,
        episode: Option<&Episode>,
        rate: PlaybackRate,
        elapsed: Duration,
        duration: Option<Duration>,
    ) {
        let info = Self::project(episode, rate, elapsed, duration);
        self.center.publish(info.clone());
        self.last = info;
    }

    pub fn clear(&mut self) {
        self.center.publish(None);
        self.last = None;
    }

    /// Last published metadata.
    pub fn current(&self) -> Option<&NowPlayingInfo> {
        self.last.as_ref()
    }
}
