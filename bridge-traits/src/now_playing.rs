//! Lock-screen / remote-control metadata surface.

use serde::{Deserialize, Serialize};

/// Metadata shown by the platform's now-playing surface (lock screen,
/// notification shade, media keys overlay, car head units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    /// Episode title.
    pub title: String,
    /// Displayed as the artist line; podcasts use the series title.
    pub artist: String,
    /// Displayed as the album line; podcasts use the series title.
    pub album: String,
    /// Rate the surface should extrapolate elapsed time with.
    pub playback_rate: f32,
    /// Elapsed playback time in seconds.
    pub elapsed_seconds: f64,
    /// Media duration in seconds; `0.0` while indefinite.
    pub duration_seconds: f64,
}

impl NowPlayingInfo {
    /// Seconds left until the end of the media, never negative.
    pub fn remaining_seconds(&self) -> f64 {
        (self.duration_seconds - self.elapsed_seconds).max(0.0)
    }
}

/// Host surface receiving now-playing metadata.
///
/// `None` clears the surface.
pub trait NowPlayingCenter: Send + Sync {
    fn publish(&self, info: Option<NowPlayingInfo>);
}

/// Surface used when the host has no now-playing integration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedNowPlayingCenter;

impl NowPlayingCenter for DetachedNowPlayingCenter {
    fn publish(&self, _info: Option<NowPlayingInfo>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_clamped() {
        let info = NowPlayingInfo {
            title: "Episode".into(),
            artist: "Series".into(),
            album: "Series".into(),
            playback_rate: 1.0,
            elapsed_seconds: 130.0,
            duration_seconds: 120.0,
        };
        assert_eq!(info.remaining_seconds(), 0.0);
    }
}
