//! Listening-duration accounting.
//!
//! Only one episode accrues at a time. Movement of the play head is
//! collected as an unflushed fraction and folded into the episode's
//! [`ListeningDuration`] on [`flush`](ListeningAccumulator::flush). Every
//! delta counts by absolute value, so moving backward also accrues.

use bridge_traits::ListeningDuration;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone)]
struct ActiveAccrual {
    episode_id: String,
    /// Position the next delta is measured from.
    last_progress: f64,
    unflushed: f64,
}

/// Per-episode listening statistics for the lifetime of the player.
#[derive(Debug, Default)]
pub struct ListeningAccumulator {
    active: Option<ActiveAccrual>,
    durations: HashMap<String, ListeningDuration>,
}

impl ListeningAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accruing for `episode_id` from `start_progress`.
    ///
    /// Any unflushed fraction of the previous episode is discarded; callers
    /// flush before switching.
    pub fn begin(&mut self, episode_id: &str, start_progress: f64) {
        self.active = Some(ActiveAccrual {
            episode_id: episode_id.to_string(),
            last_progress: sanitize(start_progress),
            unflushed: 0.0,
        });
    }

    /// Stop accruing. Returns the episode that was active.
    pub fn end(&mut self) -> Option<String> {
        self.active.take().map(|accrual| accrual.episode_id)
    }

    pub fn active_episode(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.episode_id.as_str())
    }

    /// Add `|delta|` to the unflushed fraction of the active episode.
    ///
    /// Returns `false` when `episode_id` is not the active episode or the
    /// delta is not finite.
    pub fn record_delta(&mut self, episode_id: &str, delta: f64) -> bool {
        if !delta.is_finite() {
            return false;
        }
        match self.active.as_mut() {
            Some(accrual) if accrual.episode_id == episode_id => {
                accrual.unflushed += delta.abs();
                true
            }
            _ => false,
        }
    }

    /// Record the movement from the last observed position to `progress`.
    pub fn observe_progress(&mut self, episode_id: &str, progress: f64) {
        let progress = sanitize(progress);
        let Some(last) = self.last_progress_for(episode_id) else {
            return;
        };
        if self.record_delta(episode_id, progress - last) {
            self.rebase(episode_id, progress);
            trace!(episode_id, progress, "Progress observed");
        }
    }

    /// Move the measuring point without accruing, e.g. after a seek lands.
    pub fn rebase(&mut self, episode_id: &str, progress: f64) {
        if let Some(accrual) = self.active.as_mut() {
            if accrual.episode_id == episode_id {
                accrual.last_progress = sanitize(progress);
            }
        }
    }

    /// Position the active episode is measured from.
    pub fn last_progress(&self) -> Option<f64> {
        self.active.as_ref().map(|a| a.last_progress)
    }

    fn last_progress_for(&self, episode_id: &str) -> Option<f64> {
        self.active
            .as_ref()
            .filter(|a| a.episode_id == episode_id)
            .map(|a| a.last_progress)
    }

    /// Unflushed fraction of the active episode.
    pub fn unflushed(&self) -> f64 {
        self.active.as_ref().map_or(0.0, |a| a.unflushed)
    }

    /// Commit the unflushed fraction into the record for `episode_id`.
    ///
    /// The record is created on first flush. `real_duration` of `None`
    /// keeps the previously known duration.
    pub fn flush(
        &mut self,
        episode_id: &str,
        current_progress: f64,
        real_duration: Option<f64>,
    ) -> &ListeningDuration {
        let unflushed = match self.active.as_mut() {
            Some(accrual) if accrual.episode_id == episode_id => {
                std::mem::take(&mut accrual.unflushed)
            }
            _ => 0.0,
        };

        let record = self
            .durations
            .entry(episode_id.to_string())
            .or_insert_with(|| ListeningDuration::new(episode_id));
        record.current_progress = sanitize(current_progress);
        record.percentage_listened += unflushed;
        if let Some(duration) = real_duration.filter(|d| d.is_finite() && *d >= 0.0) {
            record.real_duration = duration;
        }
        record
    }

    pub fn get(&self, episode_id: &str) -> Option<&ListeningDuration> {
        self.durations.get(episode_id)
    }

    /// Snapshot of every record. Does not reset anything.
    pub fn export_all(&self) -> HashMap<String, ListeningDuration> {
        self.durations.clone()
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }
}

fn sanitize(progress: f64) -> f64 {
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
