use std::path::Path;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::alert::DEFAULT_UNSAFE_THRESHOLD;
use crate::error::Error;
use crate::stats::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of history snapshots kept, oldest evicted first
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Environment is unsafe when a frame holds more unsafe boxes than this
    #[serde(default = "default_unsafe_threshold")]
    pub unsafe_threshold: usize,

    /// Upper bound a snapshot reader waits for the state lock
    #[serde(default = "default_snapshot_timeout_ms")]
    pub snapshot_timeout_ms: u64,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_unsafe_threshold() -> usize {
    DEFAULT_UNSAFE_THRESHOLD
}

fn default_snapshot_timeout_ms() -> u64 {
    1000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            unsafe_threshold: default_unsafe_threshold(),
            snapshot_timeout_ms: default_snapshot_timeout_ms(),
        }
    }
}

impl MonitorConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let src = std::fs::read_to_string(path)?;

        Self::from_toml_str(&src)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.history_capacity == 0 {
            return Err(Error::InvalidConfig(
                "history_capacity must be positive".into(),
            ));
        }

        if self.snapshot_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "snapshot_timeout_ms must be positive".into(),
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }
}
