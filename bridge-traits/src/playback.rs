//! Media session bridge traits.
//!
//! The platform media stack (AVFoundation, ExoPlayer, GStreamer, a browser
//! `<audio>` element...) is modeled as an opaque [`MediaSession`]. Every
//! command on the session is *issued* synchronously and returns immediately;
//! the effect is reported later through a [`SessionEventSender`] that the
//! session receives with each [`LoadRequest`]. Each load attempt carries a
//! [`SessionToken`] so the core can tell a current callback from a late one
//! belonging to a superseded load.

use crate::error::Result;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Generation token distinguishing one load attempt from the next.
///
/// Tokens are strictly increasing for the lifetime of an engine. A callback
/// tagged with anything other than the engine's current token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Token used before any media has been loaded.
    pub const INITIAL: SessionToken = SessionToken(0);

    /// Construct a token from a raw generation value.
    pub fn from_raw(generation: u64) -> Self {
        Self(generation)
    }

    /// The token following this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Raw generation value.
    pub fn generation(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Identifies one issued seek so its completion can be matched to its intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekTicket(u64);

impl SeekTicket {
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Readiness of the media currently installed in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing loaded.
    Idle,
    /// Load issued, media not yet playable.
    Loading,
    /// Media is playable; duration may still be indefinite for live streams.
    Ready,
    /// The last load failed. The session should be discarded.
    Failed,
}

/// What happened inside the media stack.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    /// The loaded media became playable.
    Ready,
    /// The load failed; the session is unusable.
    Failed { message: String },
    /// Playback reached the end of the media.
    ReachedEnd,
    /// A previously issued seek finished (or was interrupted when `finished` is false).
    SeekCompleted { ticket: SeekTicket, finished: bool },
}

/// A session callback tagged with the load attempt it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub token: SessionToken,
    pub kind: SessionEventKind,
}

impl SessionEvent {
    pub fn new(token: SessionToken, kind: SessionEventKind) -> Self {
        Self { token, kind }
    }
}

/// Callback channel handed to a session with each load request.
///
/// All events sent through it carry the token of the load that created it,
/// so platform code never has to track generations itself.
#[derive(Debug, Clone)]
pub struct SessionEventSender {
    token: SessionToken,
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionEventSender {
    pub fn new(token: SessionToken, sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { token, sender }
    }

    /// Token of the load attempt this sender reports for.
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Report that the media is playable.
    pub fn ready(&self) -> bool {
        self.send(SessionEventKind::Ready)
    }

    /// Report a load failure.
    pub fn failed(&self, message: impl Into<String>) -> bool {
        self.send(SessionEventKind::Failed {
            message: message.into(),
        })
    }

    /// Report that playback hit the end of the media.
    pub fn reached_end(&self) -> bool {
        self.send(SessionEventKind::ReachedEnd)
    }

    /// Report completion of a seek.
    pub fn seek_completed(&self, ticket: SeekTicket, finished: bool) -> bool {
        self.send(SessionEventKind::SeekCompleted { ticket, finished })
    }

    /// Returns `false` when the owning engine is gone.
    fn send(&self, kind: SessionEventKind) -> bool {
        self.sender.send(SessionEvent::new(self.token, kind)).is_ok()
    }
}

/// Request describing the media a session should install.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Remote or local URL of the audio asset.
    pub url: String,
    /// Start playback as soon as possible instead of buffering to avoid stalls.
    pub prefer_immediate_start: bool,
    /// Where readiness, failure, end-of-media and seek completions are reported.
    pub events: SessionEventSender,
}

impl LoadRequest {
    pub fn new(url: impl Into<String>, events: SessionEventSender) -> Self {
        Self {
            url: url.into(),
            prefer_immediate_start: true,
            events,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.events.token()
    }
}

/// Platform media session.
///
/// Implementations must never block: commands are queued to the native
/// player and their completion, if any, is reported through the
/// [`SessionEventSender`] supplied in [`LoadRequest`].
pub trait MediaSession: Send {
    /// Replace the installed media with `request.url`.
    ///
    /// An `Err` means the load could not even be issued; asynchronous
    /// failures are reported with [`SessionEventSender::failed`].
    fn load(&mut self, request: LoadRequest) -> Result<()>;

    /// Current readiness of the installed media.
    fn status(&self) -> SessionStatus;

    /// Start or resume playback at `rate`.
    fn play(&mut self, rate: f32);

    /// Pause playback, keeping the current position.
    fn pause(&mut self);

    /// Effective playback rate. `0.0` while paused or stopped.
    fn rate(&self) -> f32;

    /// Change the rate of ongoing playback.
    fn set_rate(&mut self, rate: f32);

    /// Seek to an absolute position. Implementations clamp to the media bounds.
    fn seek(&mut self, position: Duration, ticket: SeekTicket);

    /// Current playback position.
    fn current_time(&self) -> Duration;

    /// Media duration; `None` while indefinite (not loaded yet, or live).
    fn duration(&self) -> Option<Duration>;

    /// Activate the platform audio route (audio session, output device).
    fn activate_audio_route(&mut self) -> Result<()>;
}

/// Creates fresh media sessions. Used at startup and to replace a session
/// whose load failed.
pub trait MediaSessionFactory: Send + Sync {
    fn create_session(&self) -> Box<dyn MediaSession>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_increase() {
        let first = SessionToken::INITIAL;
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.generation(), 1);
        assert_eq!(second.to_string(), "gen-1");
    }

    #[test]
    fn sender_tags_events_with_its_token() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = SessionEventSender::new(SessionToken::from_raw(7), tx);

        assert!(events.ready());
        assert!(events.seek_completed(SeekTicket::from_raw(3), true));

        let ready = rx.try_recv().unwrap();
        assert_eq!(ready.token, SessionToken::from_raw(7));
        assert_eq!(ready.kind, SessionEventKind::Ready);

        let seek = rx.try_recv().unwrap();
        assert_eq!(
            seek.kind,
            SessionEventKind::SeekCompleted {
                ticket: SeekTicket::from_raw(3),
                finished: true
            }
        );
    }

    #[test]
    fn sender_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = SessionEventSender::new(SessionToken::INITIAL, tx);
        drop(rx);
        assert!(!events.failed("gone"));
    }

    #[test]
    fn load_request_prefers_immediate_start() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let request = LoadRequest::new(
            "https://cdn.example.com/ep.mp3",
            SessionEventSender::new(SessionToken::from_raw(2), tx),
        );
        assert!(request.prefer_immediate_start);
        assert_eq!(request.token(), SessionToken::from_raw(2));
    }
}
