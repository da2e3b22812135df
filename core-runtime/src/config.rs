//! # Core Configuration Module
//!
//! Holds the host capabilities and settings the playback core is started with.
//!
//! ## Overview
//!
//! A [`CoreConfig`] is assembled through [`CoreConfigBuilder`], which fails
//! fast when a required capability is missing and checks feature flags
//! against the capabilities actually injected.
//!
//! ## Required Dependencies
//!
//! - `MediaSessionFactory` - Creates the platform player sessions
//!
//! ## Optional Dependencies
//!
//! - `NowPlayingCenter` - Lock-screen metadata (defaults to a detached center)
//! - `ListeningHistoryService` - Listening history endpoints
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_sessions(Arc::new(MySessionFactory))
//!     .now_playing(Arc::new(MyNowPlayingCenter))
//!     .listening_history(Arc::new(MyHistoryService))
//!     .enable_listening_history(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::{
    DetachedNowPlayingCenter, ListeningHistoryService, MediaSessionFactory, NowPlayingCenter,
};
use std::sync::Arc;

/// Largest accepted event bus capacity.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the playback core.
#[derive(Clone)]
pub struct CoreConfig {
    /// Factory for platform media sessions (required)
    pub media_sessions: Arc<dyn MediaSessionFactory>,

    /// Lock-screen metadata publisher
    pub now_playing: Arc<dyn NowPlayingCenter>,

    /// Listening history endpoints (optional)
    pub listening_history: Option<Arc<dyn ListeningHistoryService>>,

    /// Capacity of the broadcast event bus
    pub event_buffer_size: usize,

    /// Features flags
    pub features: FeatureFlags,

    /// Global logging setup; `None` leaves subscriber installation to the host
    pub logging: Option<LoggingConfig>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_sessions", &"MediaSessionFactory { ... }")
            .field("now_playing", &"NowPlayingCenter { ... }")
            .field(
                "listening_history",
                &self
                    .listening_history
                    .as_ref()
                    .map(|_| "ListeningHistoryService { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Publish now-playing metadata to the host center
    pub enable_now_playing: bool,

    /// Record listening history (requires ListeningHistoryService)
    pub enable_listening_history: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_now_playing: true,
            enable_listening_history: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is in `1..=10_000`
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_listening_history && self.listening_history.is_none() {
            return Err(Error::Config(
                "Listening history enabled but no ListeningHistoryService provided. \
                 Disable the feature or inject a ListeningHistoryService implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// History service, only when the feature is switched on.
    pub fn active_listening_history(&self) -> Option<Arc<dyn ListeningHistoryService>> {
        if self.features.enable_listening_history {
            self.listening_history.clone()
        } else {
            None
        }
    }

    /// Now-playing center, or a detached one when the feature is off.
    pub fn active_now_playing(&self) -> Arc<dyn NowPlayingCenter> {
        if self.features.enable_now_playing {
            Arc::clone(&self.now_playing)
        } else {
            Arc::new(DetachedNowPlayingCenter)
        }
    }
}

fn media_sessions_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaSessionFactory".to_string(),
        message: "MediaSessionFactory implementation is required for audio playback. \
                 iOS: inject an AVPlayer-backed factory. \
                 Android: inject an ExoPlayer-backed factory. \
                 Tests: inject a scripted fake session factory."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_sessions: Option<Arc<dyn MediaSessionFactory>>,
    now_playing: Option<Arc<dyn NowPlayingCenter>>,
    listening_history: Option<Arc<dyn ListeningHistoryService>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the media session factory.
    pub fn media_sessions(mut self, factory: Arc<dyn MediaSessionFactory>) -> Self {
        self.media_sessions = Some(factory);
        self
    }

    /// Sets the now-playing center.
    pub fn now_playing(mut self, center: Arc<dyn NowPlayingCenter>) -> Self {
        self.now_playing = Some(center);
        self
    }

    /// Sets the listening history service.
    pub fn listening_history(mut self, service: Arc<dyn ListeningHistoryService>) -> Self {
        self.listening_history = Some(service);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_now_playing(mut self, enabled: bool) -> Self {
        self.features.enable_now_playing = enabled;
        self
    }

    pub fn enable_listening_history(mut self, enabled: bool) -> Self {
        self.features.enable_listening_history = enabled;
        self
    }

    /// Replaces all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Installs a global tracing subscriber when the core starts.
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `MediaSessionFactory` was given
    /// - [`Error::Config`] when [`CoreConfig::validate`] fails
    pub fn build(self) -> Result<CoreConfig> {
        let media_sessions = self.media_sessions.ok_or_else(media_sessions_missing_error)?;

        let config = CoreConfig {
            media_sessions,
            now_playing: self
                .now_playing
                .unwrap_or_else(|| Arc::new(DetachedNowPlayingCenter)),
            listening_history: self.listening_history,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
            logging: self.logging,
        };

        config.validate()?;

        Ok(config)
    }
}
