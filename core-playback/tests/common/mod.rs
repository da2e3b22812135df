//! Scriptable media session shared by the integration suites.
#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, LoadRequest, MediaSession, MediaSessionFactory, SeekTicket, SessionEvent,
    SessionEventSender, SessionStatus,
};
use core_library::{Canonical, Episode, IdentityCache};
use core_playback::{EventDisposition, PlaybackConfig, PlaybackDeps, PlaybackEngine};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Fake MediaSession
// ============================================================================

#[derive(Debug)]
pub struct SessionState {
    pub status: SessionStatus,
    pub loads: Vec<String>,
    pub events: Option<SessionEventSender>,
    pub rate: f32,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub seeks: Vec<Duration>,
    pub fail_next_load: bool,
    pub route_activations: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            loads: Vec::new(),
            events: None,
            rate: 0.0,
            position: Duration::ZERO,
            duration: None,
            seeks: Vec::new(),
            fail_next_load: false,
            route_activations: 0,
        }
    }
}

/// Test-side view of one fake session.
#[derive(Clone, Default)]
pub struct SessionProbe(Arc<Mutex<SessionState>>);

impl SessionProbe {
    /// Report the media as playable with `duration`.
    pub fn ready(&self, duration: Duration) -> bool {
        let mut state = self.0.lock();
        state.status = SessionStatus::Ready;
        state.duration = Some(duration);
        state.events.as_ref().is_some_and(|events| events.ready())
    }

    pub fn fail(&self, message: &str) -> bool {
        let mut state = self.0.lock();
        state.status = SessionStatus::Failed;
        state.events.as_ref().is_some_and(|events| events.failed(message))
    }

    pub fn reach_end(&self) -> bool {
        let mut state = self.0.lock();
        if let Some(duration) = state.duration {
            state.position = duration;
        }
        state.rate = 0.0;
        state.events.as_ref().is_some_and(|events| events.reached_end())
    }

    /// Move the play head as if `seconds` of media had played.
    pub fn advance(&self, seconds: u64) {
        let mut state = self.0.lock();
        let mut position = state.position + Duration::from_secs(seconds);
        if let Some(duration) = state.duration {
            position = position.min(duration);
        }
        state.position = position;
    }

    pub fn fail_next_load(&self) {
        self.0.lock().fail_next_load = true;
    }

    /// Sender of the most recent load, for replaying late callbacks.
    pub fn events(&self) -> SessionEventSender {
        self.0
            .lock()
            .events
            .clone()
            .expect("no load issued on this session")
    }

    pub fn rate(&self) -> f32 {
        self.0.lock().rate
    }

    pub fn position(&self) -> Duration {
        self.0.lock().position
    }

    pub fn loads(&self) -> Vec<String> {
        self.0.lock().loads.clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.0.lock().seeks.clone()
    }

    pub fn route_activations(&self) -> usize {
        self.0.lock().route_activations
    }
}

pub struct FakeSession {
    state: Arc<Mutex<SessionState>>,
}

impl MediaSession for FakeSession {
    fn load(&mut self, request: LoadRequest) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_load) {
            state.status = SessionStatus::Failed;
            return Err(BridgeError::MediaSession("unreachable host".into()));
        }
        state.loads.push(request.url.clone());
        state.events = Some(request.events);
        state.status = SessionStatus::Loading;
        state.rate = 0.0;
        state.position = Duration::ZERO;
        state.duration = None;
        Ok(())
    }

    fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    fn play(&mut self, rate: f32) {
        self.state.lock().rate = rate;
    }

    fn pause(&mut self) {
        self.state.lock().rate = 0.0;
    }

    fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    fn set_rate(&mut self, rate: f32) {
        self.state.lock().rate = rate;
    }

    /// Lands immediately; the completion is queued like a real callback.
    fn seek(&mut self, position: Duration, ticket: SeekTicket) {
        let mut state = self.state.lock();
        let position = match state.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        state.position = position;
        state.seeks.push(position);
        if let Some(events) = &state.events {
            events.seek_completed(ticket, true);
        }
    }

    fn current_time(&self) -> Duration {
        self.state.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        self.state.lock().duration
    }

    fn activate_audio_route(&mut self) -> BridgeResult<()> {
        self.state.lock().route_activations += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFactory {
    sessions: Mutex<Vec<SessionProbe>>,
}

impl FakeFactory {
    /// Probe for the session the engine is currently using.
    pub fn latest(&self) -> SessionProbe {
        self.sessions
            .lock()
            .last()
            .cloned()
            .expect("engine created no session")
    }

    pub fn created(&self) -> usize {
        self.sessions.lock().len()
    }
}

impl MediaSessionFactory for FakeFactory {
    fn create_session(&self) -> Box<dyn MediaSession> {
        let probe = SessionProbe::default();
        self.sessions.lock().push(probe.clone());
        Box::new(FakeSession { state: probe.0 })
    }
}

// ============================================================================
// Engine harness
// ============================================================================

pub const EPISODE_LENGTH: Duration = Duration::from_secs(100);

pub fn episode_json(id: &str, audio_url: Option<&str>) -> Value {
    json!({
        "id": id,
        "title": format!("Episode {}", id),
        "seriesTitle": "Morning Show",
        "audioUrl": audio_url,
    })
}

pub fn seed_episode(cache: &IdentityCache, id: &str) -> Canonical<Episode> {
    let url = format!("https://cdn.example.com/{}.mp3", id);
    cache
        .upsert_episode(&episode_json(id, Some(&url)))
        .expect("valid episode payload")
}

pub struct Harness {
    pub engine: PlaybackEngine,
    pub session_events: mpsc::UnboundedReceiver<SessionEvent>,
    pub factory: Arc<FakeFactory>,
    pub cache: Arc<IdentityCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|deps| deps)
    }

    /// Build with extra collaborators, e.g. an event bus.
    pub fn with(customize: impl FnOnce(PlaybackDeps) -> PlaybackDeps) -> Self {
        let cache = Arc::new(IdentityCache::new());
        let factory = Arc::new(FakeFactory::default());
        let deps = customize(PlaybackDeps::new(cache.clone(), factory.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        let engine =
            PlaybackEngine::new(PlaybackConfig::default(), deps, tx).expect("valid config");

        Self {
            engine,
            session_events: rx,
            factory,
            cache,
        }
    }

    pub fn session(&self) -> SessionProbe {
        self.factory.latest()
    }

    /// Deliver every queued session callback, including ones raised while
    /// handling earlier callbacks.
    pub fn pump(&mut self) -> Vec<EventDisposition> {
        let mut handled = Vec::new();
        while let Ok(event) = self.session_events.try_recv() {
            handled.push(self.engine.handle_session_event(event));
        }
        handled
    }

    /// Select `id` and bring its media to ready, autoplaying.
    pub fn start(&mut self, id: &str) {
        self.engine.select_episode(id).expect("selection succeeds");
        self.session().ready(EPISODE_LENGTH);
        self.pump();
    }

    pub fn is_playing_flag(&self, id: &str) -> bool {
        self.cache
            .episode(id)
            .map(|ep| ep.read().is_playing)
            .unwrap_or(false)
    }
}
