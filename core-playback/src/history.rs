//! Fire-and-forget listening history records.

use bridge_traits::ListeningHistoryService;
use core_runtime::events::{CoreEvent, EventBus, HistoryEvent};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tells the history service an episode was selected, without waiting.
pub struct HistoryRecorder {
    service: Option<Arc<dyn ListeningHistoryService>>,
    events: Option<EventBus>,
}

impl HistoryRecorder {
    pub fn new(service: Option<Arc<dyn ListeningHistoryService>>, events: Option<EventBus>) -> Self {
        Self { service, events }
    }

    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Spawn `create_listening_history` on the current tokio runtime.
    ///
    /// Returns `false` when no service is configured or no runtime is running.
    pub fn record_selection(&self, episode_id: &str) -> bool {
        let Some(service) = self.service.clone() else {
            return false;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(episode_id, "No runtime; listening history record skipped");
            return false;
        };

        let events = self.events.clone();
        let episode_id = episode_id.to_string();
        handle.spawn(async move {
            if let Err(err) = service.create_listening_history(&episode_id).await {
                warn!(episode_id = %episode_id, error = %err, "Failed to create listening history");
                if let Some(bus) = events {
                    let _ = bus.emit(CoreEvent::History(HistoryEvent::RecordFailed {
                        episode_id,
                        message: err.to_string(),
                    }));
                }
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, ListeningDuration};
    use mockall::mock;
    use mockall::predicate::eq;
    use std::collections::HashMap;

    mock! {
        History {}

        #[async_trait]
        impl ListeningHistoryService for History {
            async fn create_listening_history(&self, episode_id: &str) -> BridgeResult<()>;
            async fn save_listening_durations(
                &self,
                durations: HashMap<String, ListeningDuration>,
            ) -> BridgeResult<()>;
        }
    }

    #[test]
    fn test_without_service_nothing_happens() {
        assert!(!HistoryRecorder::disabled().record_selection("1"));
    }

    #[tokio::test]
    async fn test_failure_is_reported_on_bus() {
        let mut service = MockHistory::new();
        service
            .expect_create_listening_history()
            .with(eq("ep-1"))
            .times(1)
            .returning(|_| Err(BridgeError::RequestRejected("500".into())));

        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let recorder = HistoryRecorder::new(Some(Arc::new(service)), Some(bus));

        assert!(recorder.record_selection("ep-1"));
        match rx.recv().await.unwrap() {
            CoreEvent::History(HistoryEvent::RecordFailed { episode_id, .. }) => {
                assert_eq!(episode_id, "ep-1")
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
