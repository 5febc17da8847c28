use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::debug;

use crate::alert::{self, FrameAlert};
use crate::detection::Detection;
use crate::identity::{IdentityTracker, Observation};
use crate::stats::{Aggregator, Statistics};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Everything a frame mutates. Always accessed under one lock so that a
/// reader never sees a transition applied halfway.
#[derive(Debug)]
pub struct MonitorState {
    pub tracker: IdentityTracker,
    pub aggregator: Aggregator,
}

impl MonitorState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            tracker: IdentityTracker::new(),
            aggregator: Aggregator::new(history_capacity),
        }
    }

    pub fn process(
        &mut self,
        detections: &[Detection],
        unsafe_threshold: usize,
        now: DateTime<Local>,
    ) -> FrameAlert {
        let observations: Vec<Observation> = detections.iter().map(Into::into).collect();
        let frame_unsafe = observations
            .iter()
            .filter(|o| o.category.is_unsafe())
            .count();

        let delta = self.tracker.update(&observations);

        for t in &delta.transitions {
            assert!(
                self.tracker.is_tracked(t.track_id),
                "transition for track {} which is not tracked",
                t.track_id
            );
        }

        self.aggregator
            .apply(&delta, self.tracker.counted_len(), frame_unsafe, now);

        if !delta.new_alerts.is_empty() {
            debug!("new alerts: {:?}", delta.new_alerts);
        }

        alert::evaluate(frame_unsafe, delta.new_alerts, unsafe_threshold)
    }

    /// Cumulative counters plus the live alert view of the tracked identities.
    pub fn statistics(&self, unsafe_threshold: usize) -> Statistics {
        let unsafe_count = self.tracker.unsafe_count();

        Statistics {
            unsafe_count,
            environment_unsafe: alert::is_environment_unsafe(unsafe_count, unsafe_threshold),
            tracked_count: self.tracker.tracked_len(),
            ..self.aggregator.snapshot()
        }
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.aggregator.reset();
    }
}

/// Result of a snapshot read.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Fresh(Statistics),
    /// The state could not be read in time, holds the last statistics
    /// served (or the neutral default).
    Stale(Statistics),
}

impl Snapshot {
    #[inline]
    pub fn is_stale(&self) -> bool {
        matches!(self, Snapshot::Stale(_))
    }

    #[inline]
    pub fn statistics(&self) -> &Statistics {
        match self {
            Snapshot::Fresh(s) | Snapshot::Stale(s) => s,
        }
    }

    #[inline]
    pub fn into_statistics(self) -> Statistics {
        match self {
            Snapshot::Fresh(s) | Snapshot::Stale(s) => s,
        }
    }
}

pub enum TimedLock<'a, T> {
    Acquired(MutexGuard<'a, T>),
    TimedOut,
    Poisoned,
}

/// Polls `try_lock` until `timeout` elapses.
pub fn lock_with_timeout<T>(mutex: &Mutex<T>, timeout: Duration) -> TimedLock<'_, T> {
    let deadline = Instant::now() + timeout;

    loop {
        match mutex.try_lock() {
            Ok(guard) => return TimedLock::Acquired(guard),
            Err(TryLockError::Poisoned(_)) => return TimedLock::Poisoned,
            Err(TryLockError::WouldBlock) => {
                let now = Instant::now();
                if now >= deadline {
                    return TimedLock::TimedOut;
                }

                thread::sleep(LOCK_RETRY_INTERVAL.min(deadline - now));
            }
        }
    }
}
