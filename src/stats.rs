use chrono::{DateTime, Local};
use log::warn;
use serde_derive::{Deserialize, Serialize};

use crate::category::Category;
use crate::circular_queue::CircularQueue;
use crate::detection::TrackId;
use crate::identity::TrackerDelta;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Frame-scoped compliance status.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Safe,
    Unsafe,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub with_mask: u64,
    pub without_mask: u64,
    pub incorrect_mask: u64,
}

/// Read-only statistics record handed to the serving layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_detections: u64,
    pub with_mask: u64,
    pub without_mask: u64,
    pub incorrect_mask: u64,
    pub current_status: Status,
    pub last_violation: Option<DateTime<Local>>,
    pub safety_percentage: f64,
    pub unsafe_count: usize,
    pub environment_unsafe: bool,
    pub tracked_count: usize,
    pub clamp_events: u64,
    pub detection_history: Vec<HistoryEntry>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_detections: 0,
            with_mask: 0,
            without_mask: 0,
            incorrect_mask: 0,
            current_status: Status::Safe,
            last_violation: None,
            safety_percentage: 100.0,
            unsafe_count: 0,
            environment_unsafe: false,
            tracked_count: 0,
            clamp_events: 0,
            detection_history: Vec::new(),
        }
    }
}

/// Share of compliant people in percent, rounded to one decimal with ties
/// to even. Nobody observed yet counts as fully safe.
pub fn safety_percentage(with_mask: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }

    (1000.0 * with_mask as f64 / total as f64).round_ties_even() / 10.0
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    with_mask: u64,
    without_mask: u64,
    incorrect_mask: u64,
    total_detections: u64,
    current_status: Status,
    last_violation: Option<DateTime<Local>>,
    clamp_events: u64,
    history: CircularQueue<HistoryEntry>,
}

impl Aggregator {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            with_mask: 0,
            without_mask: 0,
            incorrect_mask: 0,
            total_detections: 0,
            current_status: Status::Safe,
            last_violation: None,
            clamp_events: 0,
            history: CircularQueue::with_capacity(history_capacity),
        }
    }

    #[inline]
    fn counter_mut(&mut self, category: Category) -> Option<&mut u64> {
        match category {
            Category::WithMask => Some(&mut self.with_mask),
            Category::WithoutMask => Some(&mut self.without_mask),
            Category::IncorrectMask => Some(&mut self.incorrect_mask),
            Category::Unknown => None,
        }
    }

    fn increment(&mut self, category: Category) {
        if let Some(counter) = self.counter_mut(category) {
            *counter += 1;
        }
    }

    fn decrement(&mut self, category: Category, track_id: TrackId) {
        let clamped = match self.counter_mut(category) {
            Some(counter) if *counter > 0 => {
                *counter -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };

        if clamped {
            self.clamp_events += 1;
            warn!(
                "counter {:?} already zero on transition of track {}, clamped",
                category, track_id
            );
        }
    }

    /// Applies one frame's tracker delta. `counted` is the size of the counted
    /// set after the frame, `frame_unsafe` the number of unsafe boxes in it.
    pub fn apply(
        &mut self,
        delta: &TrackerDelta,
        counted: usize,
        frame_unsafe: usize,
        now: DateTime<Local>,
    ) {
        for &(_, category) in &delta.newly_counted {
            self.increment(category);
        }

        for t in &delta.transitions {
            self.decrement(t.from, t.track_id);
            self.increment(t.to);
        }

        self.total_detections = counted as u64;

        if delta.has_count_delta() {
            self.history.push(HistoryEntry {
                timestamp: now,
                with_mask: self.with_mask,
                without_mask: self.without_mask,
                incorrect_mask: self.incorrect_mask,
            });
        }

        if frame_unsafe > 0 {
            self.current_status = Status::Unsafe;
            self.last_violation = Some(now);
        } else {
            self.current_status = Status::Safe;
        }

        debug_assert!(
            self.clamp_events > 0 || self.counted_sum() == self.total_detections,
            "counters {} do not add up to total {}",
            self.counted_sum(),
            self.total_detections
        );
    }

    #[inline]
    pub fn counted_sum(&self) -> u64 {
        self.with_mask + self.without_mask + self.incorrect_mask
    }

    #[inline]
    pub fn total_detections(&self) -> u64 {
        self.total_detections
    }

    #[inline]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Cumulative part of the statistics. Live fields (`unsafe_count`,
    /// `environment_unsafe`, `tracked_count`) are left at their neutral values.
    pub fn snapshot(&self) -> Statistics {
        Statistics {
            total_detections: self.total_detections,
            with_mask: self.with_mask,
            without_mask: self.without_mask,
            incorrect_mask: self.incorrect_mask,
            current_status: self.current_status,
            last_violation: self.last_violation,
            safety_percentage: safety_percentage(self.with_mask, self.total_detections),
            clamp_events: self.clamp_events,
            detection_history: self.history.to_ordered_vec(),
            ..Default::default()
        }
    }

    pub fn reset(&mut self) {
        self.with_mask = 0;
        self.without_mask = 0;
        self.incorrect_mask = 0;
        self.total_detections = 0;
        self.current_status = Status::Safe;
        self.last_violation = None;
        self.clamp_events = 0;
        self.history.clear();
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
