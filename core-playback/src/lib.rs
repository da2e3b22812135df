//! # Playback Module
//!
//! Podcast playback engine: one media session, per-episode listening
//! accounting and a notification surface for UIs and lock screens.
//!
//! ## Overview
//!
//! This module handles:
//! - Episode selection, play/pause, skip, seek and rate changes
//! - Rejection of late callbacks from superseded loads
//! - Listening-duration accounting across episode switches
//! - Now-playing metadata and remote commands
//!
//! [`PlaybackEngine`] holds the state machine; [`PlayerRuntime`] runs it on a
//! single tokio task behind a cloneable [`PlayerHandle`].

pub mod accumulator;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod notifier;
pub mod now_playing;
pub mod rate;
pub mod remote;
pub mod runtime;

pub use accumulator::ListeningAccumulator;
pub use config::PlaybackConfig;
pub use engine::{EventDisposition, PlaybackDeps, PlaybackEngine, SelectOutcome};
pub use error::{PlaybackError, Result};
pub use notifier::{PlaybackSnapshot, PlayerDelegate, PlayerState};
pub use now_playing::NowPlayingProjector;
pub use rate::PlaybackRate;
pub use remote::{RemoteCommand, RemoteCommandStatus};
pub use runtime::{PlayerHandle, PlayerRuntime};
