//! # Playback Engine
//!
//! The state machine behind the player. It owns exactly one
//! [`MediaSession`] and drives it in response to listener commands, remote
//! commands, periodic ticks and [`SessionEvent`]s.
//!
//! ## States
//!
//! ```text
//! Empty ──select──▶ Loading ──Ready──▶ Paused ◀──▶ Playing
//!                     ▲                  │           │
//!                     └──────select──────┴───────────┘
//! ```
//!
//! A load failure replaces the session and returns the engine to `Empty`.
//!
//! ## Late callbacks
//!
//! Every load is tagged with a fresh [`SessionToken`]. Events carrying any
//! other token are dropped with [`EventDisposition::StaleIgnored`], so a slow
//! load that was switched away from can never touch the new episode.
//!
//! ## Accounting
//!
//! Listening time is accrued through [`ListeningAccumulator`] at pause, at
//! seeks and at switch-away. Seek jumps themselves are never counted: the
//! measuring point is rebased when the seek lands.
//!
//! The engine itself is synchronous; [`PlayerRuntime`](crate::runtime::PlayerRuntime)
//! serializes access to it on a single task.

use crate::accumulator::ListeningAccumulator;
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::history::HistoryRecorder;
use crate::notifier::{PlaybackNotifier, PlaybackSnapshot, PlayerDelegate, PlayerState};
use crate::now_playing::NowPlayingProjector;
use crate::rate::PlaybackRate;
use crate::remote::{RemoteCommand, RemoteCommandStatus};
use bridge_traits::{
    DetachedNowPlayingCenter, ListeningDuration, ListeningHistoryService, LoadRequest,
    MediaSession, MediaSessionFactory, NowPlayingCenter, NowPlayingInfo, SeekTicket,
    SessionEvent, SessionEventKind, SessionEventSender, SessionStatus, SessionToken,
};
use core_library::{Canonical, Episode, IdentityCache};
use core_runtime::events::EventBus;
use core_runtime::logging::redact_url;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Collaborators injected into the engine.
#[derive(Clone)]
pub struct PlaybackDeps {
    pub cache: Arc<IdentityCache>,
    pub sessions: Arc<dyn MediaSessionFactory>,
    pub now_playing: Arc<dyn NowPlayingCenter>,
    pub history: Option<Arc<dyn ListeningHistoryService>>,
    pub events: Option<EventBus>,
}

impl PlaybackDeps {
    pub fn new(cache: Arc<IdentityCache>, sessions: Arc<dyn MediaSessionFactory>) -> Self {
        Self {
            cache,
            sessions,
            now_playing: Arc::new(DetachedNowPlayingCenter),
            history: None,
            events: None,
        }
    }

    pub fn with_now_playing(mut self, center: Arc<dyn NowPlayingCenter>) -> Self {
        self.now_playing = center;
        self
    }

    pub fn with_history(mut self, service: Arc<dyn ListeningHistoryService>) -> Self {
        self.history = Some(service);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }
}

/// Result of [`PlaybackEngine::select_episode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The episode was already current; playback was toggled instead.
    Toggled { playing: bool },
    /// A new load was issued under `token`.
    Loading { token: SessionToken },
}

/// What the engine did with a [`SessionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Applied,
    /// The event belonged to a superseded load or an unknown seek.
    StaleIgnored,
}

/// Why a seek was issued, resolved when its completion arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeekIntent {
    /// Restore the last known position before starting playback.
    Resume,
    /// Scrubber release.
    Scrub,
    /// Absolute position in seconds.
    Absolute,
    /// Relative skip.
    Skip,
}

pub struct PlaybackEngine {
    config: PlaybackConfig,
    cache: Arc<IdentityCache>,
    sessions: Arc<dyn MediaSessionFactory>,
    session: Box<dyn MediaSession>,
    session_events: mpsc::UnboundedSender<SessionEvent>,
    token: SessionToken,
    next_ticket: u64,
    pending_seeks: HashMap<SeekTicket, SeekIntent>,
    current: Option<String>,
    saved_rate: PlaybackRate,
    autoplay: bool,
    prepared: bool,
    scrubbing: bool,
    ticking: bool,
    accumulator: ListeningAccumulator,
    projector: NowPlayingProjector,
    notifier: PlaybackNotifier,
    recorder: HistoryRecorder,
}

impl PlaybackEngine {
    /// Build an engine. Session callbacks are reported on `session_events`.
    pub fn new(
        config: PlaybackConfig,
        deps: PlaybackDeps,
        session_events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let session = deps.sessions.create_session();
        Ok(Self {
            saved_rate: config.default_rate,
            config,
            cache: deps.cache,
            sessions: deps.sessions,
            session,
            session_events,
            token: SessionToken::INITIAL,
            next_ticket: 0,
            pending_seeks: HashMap::new(),
            current: None,
            autoplay: false,
            prepared: false,
            scrubbing: false,
            ticking: false,
            accumulator: ListeningAccumulator::new(),
            projector: NowPlayingProjector::new(deps.now_playing),
            notifier: PlaybackNotifier::new(deps.events.clone()),
            recorder: HistoryRecorder::new(deps.history, deps.events),
        })
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn set_delegate(&mut self, delegate: Weak<dyn PlayerDelegate>) {
        self.notifier.set_delegate(delegate);
    }

    pub fn clear_delegate(&mut self) {
        self.notifier.clear_delegate();
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Make `episode_id` the current episode, or toggle it if it already is.
    ///
    /// The outgoing episode is flushed and loses its playing flag before the
    /// new load is issued. A missing media locator aborts before anything
    /// changes.
    #[instrument(skip(self), fields(token = %self.token))]
    pub fn select_episode(&mut self, episode_id: &str) -> Result<SelectOutcome> {
        let episode = self
            .cache
            .episode(episode_id)
            .ok_or_else(|| PlaybackError::EpisodeNotFound(episode_id.to_string()))?;

        if self.current.as_deref() == Some(episode_id) {
            if self.prepared {
                let progress = self.progress();
                self.update_episode(episode_id, |ep| ep.set_progress(progress));
            }
            let playing = self.toggle_play()?;
            return Ok(SelectOutcome::Toggled { playing });
        }

        self.recorder.record_selection(episode_id);

        let url = episode
            .read()
            .media_locator()
            .map(str::to_string)
            .ok_or_else(|| {
                warn!(episode_id, "Episode has no media locator; selection aborted");
                PlaybackError::MissingMediaLocator(episode_id.to_string())
            })?;

        if self.current.is_some() {
            self.pause_current();
        }
        self.supersede_session();
        self.retire_current(true);

        if self.session.status() == SessionStatus::Failed {
            debug!("Replacing failed media session before load");
            self.session = self.sessions.create_session();
        }

        // Install the new episode before any command reaches the session.
        let start_progress = self.cache.episodes().mutate(episode_id, |ep| {
            ep.is_playing = true;
            ep.current_progress
        })?;
        self.current = Some(episode_id.to_string());
        self.accumulator.begin(episode_id, start_progress);
        self.autoplay = true;
        self.prepared = false;
        self.scrubbing = false;

        info!(episode_id, url = %redact_url(&url), "Loading episode");
        let events = SessionEventSender::new(self.token, self.session_events.clone());
        if let Err(err) = self.session.load(LoadRequest::new(url, events)) {
            let message = err.to_string();
            self.fail_session(&message);
            return Err(PlaybackError::SessionLoadFailed(message));
        }

        self.refresh_now_playing();
        self.notifier.episode_changed(&episode.snapshot());
        self.notify_playback();
        Ok(SelectOutcome::Loading { token: self.token })
    }

    /// Token of the most recent load.
    pub fn session_token(&self) -> SessionToken {
        self.token
    }

    pub fn current_episode_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_episode(&self) -> Option<Canonical<Episode>> {
        self.current.as_deref().and_then(|id| self.cache.episode(id))
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Pause if playing, else play. Returns the resulting playing state.
    pub fn toggle_play(&mut self) -> Result<bool> {
        if self.is_playing() {
            self.pause()?;
        } else {
            self.play()?;
        }
        Ok(self.is_playing())
    }

    /// Start playback at the saved rate, or arm autoplay while loading.
    #[instrument(skip(self), fields(episode = ?self.current))]
    pub fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }

        if !self.prepared {
            debug!("Media not ready; autoplay armed");
            self.autoplay = true;
            self.notify_playback();
            return Ok(());
        }

        if self.session.rate() != 0.0 {
            return Ok(());
        }

        self.session.activate_audio_route().map_err(|err| {
            warn!(error = %err, "Audio route activation failed");
            PlaybackError::AudioRoute(err.to_string())
        })?;

        if let (Some(duration), Some(resume_at)) =
            (self.session.duration(), self.accumulator.last_progress())
        {
            let position = duration.mul_f64(resume_at);
            self.issue_seek(position, SeekIntent::Resume);
        }

        self.session.play(self.saved_rate.as_f32());
        self.ticking = true;
        debug!(rate = %self.saved_rate, "Playback started");

        self.refresh_now_playing();
        self.notify_playback();
        Ok(())
    }

    /// Pause, remembering the live rate, or disarm autoplay while loading.
    #[instrument(skip(self), fields(episode = ?self.current))]
    pub fn pause(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }
        self.pause_current();
        Ok(())
    }

    /// Pause the loaded episode. Callers guarantee `current` is set.
    fn pause_current(&mut self) {
        if !self.prepared {
            debug!("Media not ready; autoplay disarmed");
            self.autoplay = false;
            self.notify_playback();
            return;
        }

        let Some(live) = PlaybackRate::from_live(self.session.rate()) else {
            return;
        };

        self.saved_rate = live;
        self.session.pause();
        self.observe_progress();
        self.ticking = false;
        debug!("Playback paused");

        self.refresh_now_playing();
        self.notify_playback();
    }

    /// Relative seek. Moving to or before zero skips the immediate
    /// notification; the seek completion still refreshes now-playing.
    #[instrument(skip(self))]
    pub fn skip(&mut self, seconds: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }
        if !seconds.is_finite() {
            return Err(PlaybackError::InvalidPosition(seconds));
        }

        let target = self.session.current_time().as_secs_f64() + seconds;
        let position = Duration::try_from_secs_f64(target.max(0.0))
            .map_err(|_| PlaybackError::InvalidPosition(seconds))?;
        self.observe_progress();
        self.issue_seek(position, SeekIntent::Skip);

        if target > 0.0 {
            self.notify_playback();
        }
        Ok(())
    }

    /// Absolute seek in seconds.
    #[instrument(skip(self))]
    pub fn seek_to(&mut self, position: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }
        let target = Duration::try_from_secs_f64(position)
            .map_err(|_| PlaybackError::InvalidPosition(position))?;

        self.observe_progress();
        self.issue_seek(target, SeekIntent::Absolute);
        Ok(())
    }

    /// Seek to a fraction of the duration, usually on scrubber release.
    #[instrument(skip(self))]
    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }
        if !fraction.is_finite() {
            return Err(PlaybackError::InvalidPosition(fraction));
        }
        let duration = self.session.duration().ok_or(PlaybackError::NotReady)?;

        self.observe_progress();
        self.issue_seek(duration.mul_f64(fraction.clamp(0.0, 1.0)), SeekIntent::Scrub);
        Ok(())
    }

    /// Mark the scrubber as held. Cleared when the scrub seek lands.
    pub fn begin_scrubbing(&mut self) {
        self.scrubbing = true;
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    // ========================================================================
    // Rate
    // ========================================================================

    /// Remember `rate`; apply it live only if the session is running.
    #[instrument(skip(self))]
    pub fn set_rate(&mut self, rate: PlaybackRate) {
        self.saved_rate = rate;
        if self.current.is_some() && self.session.rate() != 0.0 {
            self.session.set_rate(rate.as_f32());
        }
        self.refresh_now_playing();
        self.notify_playback();
    }

    pub fn set_rate_value(&mut self, rate: f32) -> Result<()> {
        let rate = PlaybackRate::try_from(rate)?;
        self.set_rate(rate);
        Ok(())
    }

    /// Rate the next `play()` will use.
    pub fn rate(&self) -> PlaybackRate {
        self.saved_rate
    }

    // ========================================================================
    // Position
    // ========================================================================

    /// Elapsed fraction; exactly `0` while the duration is unknown or zero.
    pub fn progress(&self) -> f64 {
        if self.current.is_none() {
            return 0.0;
        }
        match self.session.duration() {
            Some(duration) if !duration.is_zero() => {
                let fraction = self.session.current_time().as_secs_f64() / duration.as_secs_f64();
                fraction.clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        if self.current.is_none() {
            return Duration::ZERO;
        }
        self.session.current_time()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.current.as_ref()?;
        self.session.duration()
    }

    pub fn remaining(&self) -> Duration {
        self.duration()
            .map_or(Duration::ZERO, |d| d.saturating_sub(self.elapsed()))
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Playing, or waiting to autoplay once the media is ready.
    pub fn is_playing(&self) -> bool {
        self.current.is_some() && (self.session.rate() != 0.0 || (!self.prepared && self.autoplay))
    }

    pub fn state(&self) -> PlayerState {
        if self.current.is_none() {
            PlayerState::Empty
        } else if !self.prepared {
            PlayerState::Loading
        } else if self.session.rate() != 0.0 {
            PlayerState::Playing
        } else {
            PlayerState::Paused
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            episode_id: self.current.clone(),
            state: self.state(),
            is_playing: self.is_playing(),
            progress: self.progress(),
            elapsed: self.elapsed(),
            duration: self.duration(),
            rate: self.saved_rate,
            is_scrubbing: self.scrubbing,
        }
    }

    /// Last metadata published to the now-playing surface.
    pub fn now_playing(&self) -> Option<&NowPlayingInfo> {
        self.projector.current()
    }

    /// Whether periodic ticks should be delivered.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    pub fn handle_session_event(&mut self, event: SessionEvent) -> EventDisposition {
        if event.token != self.token {
            debug!(
                event_token = %event.token,
                current_token = %self.token,
                "Stale session callback ignored"
            );
            return EventDisposition::StaleIgnored;
        }

        match event.kind {
            SessionEventKind::Ready => self.on_ready(),
            SessionEventKind::Failed { message } => self.fail_session(&message),
            SessionEventKind::ReachedEnd => self.on_reached_end(),
            SessionEventKind::SeekCompleted { ticket, finished } => {
                return self.on_seek_completed(ticket, finished);
            }
        }
        EventDisposition::Applied
    }

    /// Periodic progress notification. Returns `false` when not ticking.
    pub fn on_tick(&mut self) -> bool {
        if !self.ticking {
            return false;
        }
        self.refresh_now_playing();
        self.notify_playback();
        true
    }

    fn on_ready(&mut self) {
        info!(episode = ?self.current, duration = ?self.session.duration(), "Media ready");
        self.prepared = true;
        self.refresh_now_playing();

        if self.autoplay {
            if let Err(err) = self.play() {
                warn!(error = %err, "Autoplay failed");
            }
        } else {
            self.notify_playback();
        }
    }

    fn on_reached_end(&mut self) {
        self.ticking = false;
        self.observe_progress();
        self.refresh_now_playing();
        self.notify_playback();
        if let Some(id) = self.current.as_deref() {
            info!(episode_id = id, "Reached end of episode");
            self.notifier.completed(id);
        }
    }

    fn on_seek_completed(&mut self, ticket: SeekTicket, finished: bool) -> EventDisposition {
        let Some(intent) = self.pending_seeks.remove(&ticket) else {
            debug!(ticket = ticket.value(), "Unknown seek completion ignored");
            return EventDisposition::StaleIgnored;
        };
        debug!(ticket = ticket.value(), ?intent, finished, "Seek completed");

        self.rebase_progress();
        if intent != SeekIntent::Skip {
            self.scrubbing = false;
            self.notify_playback();
        }
        self.refresh_now_playing();
        EventDisposition::Applied
    }

    /// Map a remote command onto the transport operations.
    pub fn handle_remote_command(&mut self, command: RemoteCommand) -> RemoteCommandStatus {
        if self.current.is_none() {
            return RemoteCommandStatus::NoActionableNowPlayingItem;
        }

        let result = match command {
            RemoteCommand::Play => self.play(),
            RemoteCommand::Pause => self.pause(),
            RemoteCommand::SkipForward => self.skip(self.config.skip_forward.as_secs_f64()),
            RemoteCommand::SkipBackward => self.skip(-self.config.skip_backward.as_secs_f64()),
            RemoteCommand::ChangePlaybackPosition(position) => self.seek_to(position.as_secs_f64()),
        };

        match result {
            Ok(()) => RemoteCommandStatus::Success,
            Err(err) => {
                warn!(?command, error = %err, "Remote command failed");
                RemoteCommandStatus::CommandFailed
            }
        }
    }

    // ========================================================================
    // Listening history
    // ========================================================================

    /// Flush the current episode and return every listening record.
    ///
    /// The current episode keeps playing.
    pub fn flush_and_export(&mut self) -> HashMap<String, ListeningDuration> {
        if let Some(id) = self.current.clone() {
            self.flush_episode(&id);
        }
        self.accumulator.export_all()
    }

    /// Records as of the last flush.
    pub fn listening_durations(&self) -> HashMap<String, ListeningDuration> {
        self.accumulator.export_all()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn issue_seek(&mut self, position: Duration, intent: SeekIntent) {
        self.next_ticket += 1;
        let ticket = SeekTicket::from_raw(self.next_ticket);
        self.pending_seeks.insert(ticket, intent);
        self.session.seek(position, ticket);
    }

    /// Drop observation of the current load.
    fn supersede_session(&mut self) {
        self.token = self.token.next();
        self.pending_seeks.clear();
        self.ticking = false;
    }

    /// Accrue movement since the last measuring point. Only meaningful once
    /// the duration is known.
    fn observe_progress(&mut self) {
        if !self.prepared || self.session.duration().is_none() {
            return;
        }
        let progress = self.progress();
        if let Some(id) = self.current.as_deref() {
            self.accumulator.observe_progress(id, progress);
        }
    }

    fn rebase_progress(&mut self) {
        if !self.prepared || self.session.duration().is_none() {
            return;
        }
        let progress = self.progress();
        if let Some(id) = self.current.as_deref() {
            self.accumulator.rebase(id, progress);
        }
    }

    /// Commit accrued listening for `id` and store its position.
    fn flush_episode(&mut self, id: &str) {
        self.observe_progress();
        let (progress, duration) = if self.prepared {
            let progress = self.progress();
            self.update_episode(id, |ep| ep.set_progress(progress));
            (progress, self.session.duration().map(|d| d.as_secs_f64()))
        } else {
            let stored = self
                .cache
                .episode(id)
                .map_or(0.0, |ep| ep.read().current_progress);
            (stored, None)
        };
        self.accumulator.flush(id, progress, duration);
    }

    /// Flush the outgoing episode and clear its playing flag.
    fn retire_current(&mut self, flush: bool) {
        let Some(id) = self.current.clone() else {
            return;
        };
        if flush {
            self.flush_episode(&id);
        }
        self.current = None;
        self.accumulator.end();
        self.update_episode(&id, |ep| ep.is_playing = false);
        debug!(episode_id = %id, "Episode retired");
    }

    /// Discard the session after a load failure and return to `Empty`.
    fn fail_session(&mut self, message: &str) {
        let failed = self.current.clone();
        warn!(episode = ?failed, error = message, "Media session failed");

        self.supersede_session();
        self.retire_current(self.prepared);

        self.session = self.sessions.create_session();
        self.prepared = false;
        self.autoplay = false;
        self.scrubbing = false;

        self.projector.clear();
        self.notifier.error(failed.as_deref(), message, true);
        self.notifier.became_empty();
    }

    fn update_episode(&self, id: &str, change: impl FnOnce(&mut Episode)) {
        if let Err(err) = self.cache.episodes().mutate(id, change) {
            warn!(episode_id = id, error = %err, "Episode update skipped");
        }
    }

    fn refresh_now_playing(&mut self) {
        let episode = self.current_episode().map(|ep| ep.snapshot());
        let elapsed = self.elapsed();
        let duration = self.duration();
        self.projector
            .refresh(episode.as_ref(), self.saved_rate, elapsed, duration);
    }

    fn notify_playback(&self) {
        self.notifier.playback_changed(&self.snapshot());
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("current", &self.current)
            .field("token", &self.token)
            .field("state", &self.state())
            .field("rate", &self.saved_rate)
            .field("autoplay", &self.autoplay)
            .field("prepared", &self.prepared)
            .field("ticking", &self.ticking)
            .finish()
    }
}
