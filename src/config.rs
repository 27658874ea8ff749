use crate::error::{PlaybackError, Result};
use crate::types::DEFAULT_VOLUME;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables shared by every guild of a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume a guild starts with, in [0.0, 1.0]
    pub default_volume: f32,

    /// Buffer size of the event broadcast channel
    pub event_capacity: usize,

    /// Upper bound on a single metadata resolution
    pub resolve_timeout_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
            event_capacity: 100,
            resolve_timeout_secs: 30,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(PlaybackError::Config(format!(
                "default_volume must be between 0.0 and 1.0, got {}",
                self.default_volume
            )));
        }
        if self.event_capacity == 0 {
            return Err(PlaybackError::Config("event_capacity must be at least 1".to_string()));
        }
        if self.resolve_timeout_secs == 0 {
            return Err(PlaybackError::Config("resolve_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PlayerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.default_volume, 0.5);
        assert_eq!(config.resolve_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = PlayerConfig::from_json_str(r#"{ "default_volume": 0.8 }"#).unwrap();
        assert_eq!(config.default_volume, 0.8);
        assert_eq!(config.resolve_timeout_secs, 30);
        assert_eq!(config.event_capacity, 100);
    }

    #[test]
    fn rejects_out_of_range_volume() {
        let err = PlayerConfig::from_json_str(r#"{ "default_volume": 1.5 }"#).unwrap_err();
        assert!(matches!(err, PlaybackError::Config(_)));
    }

    #[test]
    fn rejects_zero_event_capacity() {
        let err = PlayerConfig::from_json_str(r#"{ "event_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, PlaybackError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = PlayerConfig::from_json_str("{ default_volume").unwrap_err();
        assert!(matches!(err, PlaybackError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PlayerConfig::from_file("/nonexistent/guild-jukebox.json").unwrap_err();
        assert!(matches!(err, PlaybackError::Io(_)));
    }
}
