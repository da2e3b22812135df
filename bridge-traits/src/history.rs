//! Listening history persistence boundary.
//!
//! The core only produces [`ListeningDuration`] records; transport, retry and
//! serialization belong to the host's [`ListeningHistoryService`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accumulated listening statistics for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningDuration {
    /// Episode identifier.
    pub id: String,
    /// Last observed playback position as a fraction of the episode.
    pub current_progress: f64,
    /// Cumulative fraction of the episode actually played. Never decreases.
    pub percentage_listened: f64,
    /// Episode length in seconds at the time of the last session.
    pub real_duration: f64,
}

impl ListeningDuration {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            current_progress: 0.0,
            percentage_listened: 0.0,
            real_duration: 0.0,
        }
    }

    /// Listened time in seconds derived from the fraction and the duration.
    pub fn seconds_listened(&self) -> f64 {
        self.percentage_listened * self.real_duration
    }
}

/// Remote listening-history endpoints.
#[async_trait::async_trait]
pub trait ListeningHistoryService: Send + Sync {
    /// Record that the user started an episode.
    async fn create_listening_history(&self, episode_id: &str) -> Result<()>;

    /// Persist the accumulated listening durations keyed by episode id.
    async fn save_listening_durations(
        &self,
        durations: HashMap<String, ListeningDuration>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let duration = ListeningDuration {
            id: "42".into(),
            current_progress: 0.5,
            percentage_listened: 0.25,
            real_duration: 1200.0,
        };
        let json = serde_json::to_value(&duration).unwrap();
        assert_eq!(json["percentageListened"], 0.25);
        assert_eq!(json["realDuration"], 1200.0);
        assert_eq!(duration.seconds_listened(), 300.0);
    }
}
