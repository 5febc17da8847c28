pub mod alert;
pub mod category;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod identity;
pub mod monitor;
pub mod stats;

mod circular_queue;

pub use alert::FrameAlert;
pub use category::{classify, Category};
pub use config::MonitorConfig;
pub use detection::{Detection, TrackId};
pub use frame::Frame;
pub use identity::TrackedIdentity;
pub use monitor::Snapshot;
pub use stats::Statistics;

use chrono::Local;
use error::Error;
use log::{info, warn};
use monitor::{lock_with_timeout, MonitorState, TimedLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Serving-layer contract of the aggregation core.
pub trait Monitoring {
    /// Folds one frame's detections into the cumulative state as a single
    /// atomic step and returns the frame's alert payload.
    fn process_frame(&self, detections: &[Detection]) -> Result<FrameAlert, Error>;
    fn snapshot(&self) -> Snapshot;
    /// Clears all cumulative and live state. Recovers a poisoned state lock.
    fn reset(&self);
}

pub struct ComplianceMonitor {
    config: MonitorConfig,
    pub(crate) state: Mutex<MonitorState>,
    last_served: Mutex<Statistics>,
    paused: AtomicBool,
}

impl ComplianceMonitor {
    pub fn new() -> Self {
        Self::build(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self::build(config))
    }

    fn build(config: MonitorConfig) -> Self {
        Self {
            state: Mutex::new(MonitorState::new(config.history_capacity)),
            last_served: Mutex::new(Statistics::default()),
            paused: AtomicBool::new(false),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Copy of the live identity table, for overlay rendering.
    pub fn tracked(&self) -> Result<Vec<TrackedIdentity>, Error> {
        let state = self.state.lock().map_err(|_| Error::LockPoisoned)?;

        Ok(state.tracker.tracked())
    }

    /// Flips the pause flag checked by the frame producer, returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.paused.fetch_xor(true, Ordering::SeqCst);
        info!("detection {}", if paused { "paused" } else { "resumed" });

        paused
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn stale(&self) -> Snapshot {
        let stats = match self.last_served.try_lock() {
            Ok(stats) => stats.clone(),
            Err(_) => Statistics::default(),
        };

        Snapshot::Stale(stats)
    }

    fn serve(&self, stats: &Statistics) {
        if let Ok(mut last) = self.last_served.try_lock() {
            *last = stats.clone();
        }
    }
}

impl Default for ComplianceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::Monitoring for ComplianceMonitor {
    fn process_frame(&self, detections: &[Detection]) -> Result<FrameAlert, Error> {
        let mut state = self.state.lock().map_err(|_| Error::LockPoisoned)?;

        Ok(state.process(detections, self.config.unsafe_threshold, Local::now()))
    }

    fn snapshot(&self) -> Snapshot {
        match lock_with_timeout(&self.state, self.config.snapshot_timeout()) {
            TimedLock::Acquired(state) => {
                let stats = state.statistics(self.config.unsafe_threshold);
                self.serve(&stats);

                Snapshot::Fresh(stats)
            }
            TimedLock::TimedOut => {
                warn!(
                    "state busy for {} ms, serving stale statistics",
                    self.config.snapshot_timeout_ms
                );
                self.stale()
            }
            TimedLock::Poisoned => {
                warn!("state lock poisoned, serving stale statistics");
                self.stale()
            }
        }
    }

    fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| {
            warn!("state lock poisoned, recovering on reset");
            poisoned.into_inner()
        });
        state.reset();
        self.state.clear_poison();

        let mut last = self
            .last_served
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = Statistics::default();
        self.last_served.clear_poison();

        info!("statistics reset");
    }
}
