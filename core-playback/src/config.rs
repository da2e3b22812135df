//! # Player Configuration

use crate::rate::PlaybackRate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Interval of progress notifications while playing.
    ///
    /// Default: 1 second.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,

    /// Jump applied by the skip-forward remote command.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_skip_interval")]
    pub skip_forward: Duration,

    /// Jump applied by the skip-backward remote command.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_skip_interval")]
    pub skip_backward: Duration,

    /// Rate used until the listener picks another one.
    #[serde(default)]
    pub default_rate: PlaybackRate,

    /// Capacity of the player command channel.
    ///
    /// Default: 64.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            skip_forward: default_skip_interval(),
            skip_backward: default_skip_interval(),
            default_rate: PlaybackRate::default(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl PlaybackConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("tick_interval must be > 0".to_string());
        }

        if self.skip_forward.is_zero() || self.skip_backward.is_zero() {
            return Err("skip intervals must be > 0".to_string());
        }

        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_skip_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_command_buffer() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.skip_forward, Duration::from_secs(30));
        assert_eq!(config.skip_backward, Duration::from_secs(30));
        assert_eq!(config.default_rate, PlaybackRate::Normal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = PlaybackConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlaybackConfig {
            command_buffer: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err(), "command_buffer must be > 0");
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: PlaybackConfig = serde_json::from_str(r#"{"default_rate": 1.5}"#).unwrap();
        assert_eq!(config.default_rate, PlaybackRate::OneAndHalf);
        assert_eq!(config.skip_forward, Duration::from_secs(30));
        assert_eq!(config.command_buffer, 64);
    }
}
