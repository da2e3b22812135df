//! # Playback Error Types

use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Selection Errors
    // ========================================================================
    /// The episode has no audio locator; nothing was changed.
    #[error("Episode {0} has no media locator")]
    MissingMediaLocator(String),

    /// The episode id is not in the identity cache.
    #[error("Episode not found: {0}")]
    EpisodeNotFound(String),

    /// The media session rejected the load request.
    #[error("Session load failed: {0}")]
    SessionLoadFailed(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Rate outside the supported set.
    #[error("Invalid playback rate: {0} (expected one of 0.5, 1, 1.25, 1.5, 1.75, 2)")]
    InvalidRate(f32),

    /// Attempted operation when no episode is loaded.
    #[error("No episode loaded")]
    NoEpisodeLoaded,

    /// The operation needs a ready session with a known duration.
    #[error("Media not ready")]
    NotReady,

    /// Seek target is not a finite, non-negative position.
    #[error("Invalid position: {0}")]
    InvalidPosition(f64),

    /// Platform audio route could not be activated.
    #[error("Audio route error: {0}")]
    AudioRoute(String),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    /// The player task has stopped.
    #[error("Player runtime closed")]
    RuntimeClosed,

    /// No tokio runtime to spawn the player task on.
    #[error("Player runtime requires a tokio runtime")]
    RuntimeUnavailable,

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),
}

impl PlaybackError {
    /// Returns `true` if the UI should surface this error to the listener.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            PlaybackError::MissingMediaLocator(_)
                | PlaybackError::SessionLoadFailed(_)
                | PlaybackError::AudioRoute(_)
        )
    }

    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::SessionLoadFailed(_) | PlaybackError::NotReady | PlaybackError::AudioRoute(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
