//! Supported playback rates.

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback speed chosen by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub enum PlaybackRate {
    Half,
    #[default]
    Normal,
    OneAndQuarter,
    OneAndHalf,
    OneAndThreeQuarters,
    Double,
}

impl PlaybackRate {
    /// Every rate, slowest first, for rate pickers.
    pub const ALL: [PlaybackRate; 6] = [
        PlaybackRate::Half,
        PlaybackRate::Normal,
        PlaybackRate::OneAndQuarter,
        PlaybackRate::OneAndHalf,
        PlaybackRate::OneAndThreeQuarters,
        PlaybackRate::Double,
    ];

    pub fn as_f32(self) -> f32 {
        match self {
            PlaybackRate::Half => 0.5,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndQuarter => 1.25,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::OneAndThreeQuarters => 1.75,
            PlaybackRate::Double => 2.0,
        }
    }

    /// Interpret a rate read back from a media session.
    ///
    /// A paused session reports `0`, which is not a playback rate.
    pub fn from_live(rate: f32) -> Option<Self> {
        Self::try_from(rate).ok()
    }
}

impl TryFrom<f32> for PlaybackRate {
    type Error = PlaybackError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|rate| (rate.as_f32() - value).abs() < 1e-3)
            .ok_or(PlaybackError::InvalidRate(value))
    }
}

impl From<PlaybackRate> for f32 {
    fn from(rate: PlaybackRate) -> Self {
        rate.as_f32()
    }
}

impl fmt::Display for PlaybackRate {
    /// `"1x"`, `"0.5x"`, `"1.25x"`, `"2x"`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_f32())
    }
}
