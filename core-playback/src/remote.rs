//! Hardware and lock-screen commands.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Command delivered by a remote control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommand {
    Play,
    Pause,
    /// Jump forward by the configured skip interval.
    SkipForward,
    /// Jump back by the configured skip interval.
    SkipBackward,
    /// Seek to an absolute position.
    ChangePlaybackPosition(Duration),
}

/// Result reported back to the command source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommandStatus {
    Success,
    /// Nothing is loaded, so there is nothing to control.
    NoActionableNowPlayingItem,
    CommandFailed,
}

impl RemoteCommandStatus {
    pub fn is_success(self) -> bool {
        self == RemoteCommandStatus::Success
    }
}
