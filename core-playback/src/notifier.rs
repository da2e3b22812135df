//! Outbound notifications: the UI delegate and the event bus.

use crate::rate::PlaybackRate;
use core_library::Episode;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Coarse player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerState {
    /// No episode loaded.
    Empty,
    /// Episode installed, media not ready yet.
    Loading,
    Paused,
    Playing,
}

/// Everything a UI needs to draw the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub episode_id: Option<String>,
    pub state: PlayerState,
    /// Playing, or waiting to autoplay once ready.
    pub is_playing: bool,
    /// Elapsed fraction; `0` while the duration is unknown.
    pub progress: f64,
    pub elapsed: Duration,
    pub duration: Option<Duration>,
    pub rate: PlaybackRate,
    pub is_scrubbing: bool,
}

impl PlaybackSnapshot {
    pub fn empty(rate: PlaybackRate) -> Self {
        Self {
            episode_id: None,
            state: PlayerState::Empty,
            is_playing: false,
            progress: 0.0,
            elapsed: Duration::ZERO,
            duration: None,
            rate,
            is_scrubbing: false,
        }
    }

    /// Time left; zero while the duration is unknown.
    pub fn remaining(&self) -> Duration {
        self.duration
            .map_or(Duration::ZERO, |d| d.saturating_sub(self.elapsed))
    }
}

/// UI callbacks. Invoked on the player's owner task; keep them short.
pub trait PlayerDelegate: Send + Sync {
    fn on_episode_changed(&self, episode: &Episode);

    fn on_playback_state_changed(&self, snapshot: &PlaybackSnapshot);

    fn on_player_became_empty(&self);
}

/// Fans notifications out to the (weakly held) delegate and the event bus.
#[derive(Default)]
pub struct PlaybackNotifier {
    delegate: Option<Weak<dyn PlayerDelegate>>,
    events: Option<EventBus>,
}

impl PlaybackNotifier {
    pub fn new(events: Option<EventBus>) -> Self {
        Self {
            delegate: None,
            events,
        }
    }

    pub fn set_delegate(&mut self, delegate: Weak<dyn PlayerDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    fn delegate(&self) -> Option<Arc<dyn PlayerDelegate>> {
        self.delegate.as_ref().and_then(Weak::upgrade)
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.events {
            // No subscribers is fine.
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }

    pub fn episode_changed(&self, episode: &Episode) {
        if let Some(delegate) = self.delegate() {
            delegate.on_episode_changed(episode);
        }
        self.emit(PlaybackEvent::EpisodeChanged {
            episode_id: episode.id.clone(),
            title: episode.title.clone(),
        });
    }

    pub fn playback_changed(&self, snapshot: &PlaybackSnapshot) {
        if let Some(delegate) = self.delegate() {
            delegate.on_playback_state_changed(snapshot);
        }
        self.emit(PlaybackEvent::StateChanged {
            episode_id: snapshot.episode_id.clone(),
            is_playing: snapshot.is_playing,
            position_ms: snapshot.elapsed.as_millis() as u64,
            duration_ms: snapshot.duration.map(|d| d.as_millis() as u64),
            rate: snapshot.rate.to_string(),
        });
    }

    pub fn became_empty(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.on_player_became_empty();
        }
        self.emit(PlaybackEvent::PlayerEmptied);
    }

    pub fn completed(&self, episode_id: &str) {
        self.emit(PlaybackEvent::Completed {
            episode_id: episode_id.to_string(),
        });
    }

    pub fn error(&self, episode_id: Option<&str>, message: &str, recoverable: bool) {
        self.emit(PlaybackEvent::Error {
            episode_id: episode_id.map(str::to_string),
            message: message.to_string(),
            recoverable,
        });
    }
}
