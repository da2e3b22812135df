//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (media sessions,
//! now-playing center, listening-history endpoints) into the shared Rust
//! core. A host builds a [`CoreConfig`], calls [`CoreService::start`] from
//! inside its tokio runtime and then talks to the player through
//! [`CoreService::player`].
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .media_sessions(Arc::new(AvFoundationSessions::new()))
//!     .listening_history(Arc::new(HistoryEndpoints::new(client)))
//!     .enable_listening_history(true)
//!     .build()?;
//!
//! let core = CoreService::start(config, PlaybackConfig::default())?;
//! core.cache().upsert_episode(&payload)?;
//! core.player().select_episode("42").await?;
//! core.save_listening_durations().await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::ListeningHistoryService;
use core_library::IdentityCache;
use core_playback::{PlaybackConfig, PlaybackDeps, PlayerHandle, PlayerRuntime};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, HistoryEvent};
use core_runtime::logging::init_logging;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Primary façade exposed to host applications.
///
/// Owns the identity cache, the event bus and the player task. There is one
/// instance per process; share it by reference.
pub struct CoreService {
    cache: Arc<IdentityCache>,
    events: EventBus,
    player: PlayerHandle,
    player_task: JoinHandle<()>,
    listening_history: Option<Arc<dyn ListeningHistoryService>>,
}

impl CoreService {
    /// Validate `config`, install logging if requested and spawn the player.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: CoreConfig, playback: PlaybackConfig) -> Result<Self> {
        config.validate()?;

        if let Some(logging) = config.logging.clone() {
            match init_logging(logging) {
                Ok(()) => {}
                Err(core_runtime::Error::LoggingAlreadyInitialized) => {
                    debug!("Logging already initialized by host");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let events = EventBus::new(config.event_buffer_size);
        let cache = Arc::new(IdentityCache::new());
        let listening_history = config.active_listening_history();

        let mut deps = PlaybackDeps::new(cache.clone(), config.media_sessions.clone())
            .with_now_playing(config.active_now_playing())
            .with_events(events.clone());
        if let Some(service) = listening_history.clone() {
            deps = deps.with_history(service);
        }

        let (player, player_task) = PlayerRuntime::spawn(playback, deps)?;
        info!(
            now_playing = config.features.enable_now_playing,
            listening_history = listening_history.is_some(),
            "Core service started"
        );

        Ok(Self {
            cache,
            events,
            player,
            player_task,
            listening_history,
        })
    }

    /// Canonical episode, series and user records.
    pub fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        self.events.stream()
    }

    /// Flush the current episode and hand every listening record to the
    /// history service. Returns the number of records sent.
    pub async fn save_listening_durations(&self) -> Result<usize> {
        let service = self
            .listening_history
            .as_ref()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "ListeningHistoryService".to_string(),
                message: "listening history is disabled".to_string(),
            })?;

        let durations = self.player.flush_and_export().await?;
        let count = durations.len();

        match service.save_listening_durations(durations).await {
            Ok(()) => {
                info!(count, "Saved listening durations");
                let _ = self
                    .events
                    .emit(CoreEvent::History(HistoryEvent::Saved { count }));
                Ok(count)
            }
            Err(err) => {
                warn!(count, error = %err, "Failed to save listening durations");
                let _ = self
                    .events
                    .emit(CoreEvent::History(HistoryEvent::SaveFailed {
                        message: err.to_string(),
                    }));
                Err(err.into())
            }
        }
    }

    /// Stop the player task and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.player.shutdown().await;
        self.player_task
            .await
            .map_err(|err| CoreError::TaskFailed(err.to_string()))?;
        info!("Core service stopped");
        Ok(())
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("cache", &self.cache)
            .field("listening_history", &self.listening_history.is_some())
            .finish_non_exhaustive()
    }
}
