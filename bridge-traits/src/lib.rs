//! # Host Bridge Traits
//!
//! Platform capabilities the playback core needs but cannot implement itself.
//!
//! ## Overview
//!
//! Each trait is a contract between the core and the host application. The
//! core never talks to AVFoundation, ExoPlayer, MPNowPlayingInfoCenter or an
//! HTTP stack directly; it calls these traits and the host injects concrete
//! adapters at startup.
//!
//! ## Traits
//!
//! ### Playback
//! - [`MediaSession`](playback::MediaSession) - Opaque platform player (load, seek, play, pause, rate)
//! - [`MediaSessionFactory`](playback::MediaSessionFactory) - Creates and replaces sessions
//!
//! ### Presentation
//! - [`NowPlayingCenter`](now_playing::NowPlayingCenter) - Lock-screen / remote-control metadata
//!
//! ### Persistence
//! - [`ListeningHistoryService`](history::ListeningHistoryService) - Listening history endpoints
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Asynchronous completions
//!
//! Media sessions report readiness, failure, end-of-media and seek
//! completion through a [`SessionEventSender`](playback::SessionEventSender)
//! tagged with a [`SessionToken`](playback::SessionToken). The core compares
//! the token against its current generation and drops anything stale, so a
//! slow load that was superseded can never revive the wrong episode.
//!
//! ## Error Handling
//!
//! Bridge implementations convert platform errors into
//! [`BridgeError`](error::BridgeError) with an actionable message.
//!
//! ## Thread Safety
//!
//! Shared capabilities (`MediaSessionFactory`, `NowPlayingCenter`,
//! `ListeningHistoryService`, `LoggerSink`) are `Send + Sync`. A
//! `MediaSession` is owned by exactly one engine and only needs `Send`.

pub mod error;
pub mod history;
pub mod logging;
pub mod now_playing;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use history::{ListeningDuration, ListeningHistoryService};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use now_playing::{DetachedNowPlayingCenter, NowPlayingCenter, NowPlayingInfo};
pub use playback::{
    LoadRequest, MediaSession, MediaSessionFactory, SeekTicket, SessionEvent, SessionEventKind,
    SessionEventSender, SessionStatus, SessionToken,
};
