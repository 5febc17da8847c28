use std::collections::{HashMap, HashSet};

use log::debug;
use serde_derive::Serialize;

use crate::category::Category;
use crate::detection::{Detection, TrackId};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Safety {
    #[default]
    Safe,
    Unsafe,
}

impl From<Category> for Safety {
    #[inline]
    fn from(category: Category) -> Self {
        if category.is_unsafe() {
            Safety::Unsafe
        } else {
            Safety::Safe
        }
    }
}

/// Classified detection, the unit the tracker consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub track_id: Option<TrackId>,
    pub category: Category,
}

impl From<&Detection> for Observation {
    fn from(det: &Detection) -> Self {
        Self {
            track_id: det.track_id,
            category: det.category(),
        }
    }
}

/// Last known state of an identity currently visible to the upstream tracker.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackedIdentity {
    pub track_id: TrackId,
    pub category: Category,
    pub safety: Safety,
    // raised on a safe -> unsafe edge, cleared on unsafe -> safe
    pub alerted: bool,
    pub status_text: &'static str,
}

impl TrackedIdentity {
    fn new(track_id: TrackId, category: Category) -> Self {
        Self {
            track_id,
            category,
            safety: category.into(),
            alerted: false,
            status_text: category.status_text(),
        }
    }

    #[inline]
    pub fn is_unsafe(&self) -> bool {
        self.safety == Safety::Unsafe
    }
}

/// Move of one counted identity from one cumulative counter to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub track_id: TrackId,
    pub from: Category,
    pub to: Category,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerDelta {
    pub newly_counted: Vec<(TrackId, Category)>,
    pub transitions: Vec<Transition>,
    pub new_alerts: Vec<TrackId>,
    pub departed: Vec<TrackId>,
}

impl TrackerDelta {
    #[inline]
    pub fn has_count_delta(&self) -> bool {
        !self.newly_counted.is_empty() || !self.transitions.is_empty()
    }
}

/// Live table of visible identities plus the ledger of every identity ever
/// counted. The ledger remembers which counter each identity currently
/// contributes to, so a transition always moves exactly the unit that was
/// added for it.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    tracked: HashMap<TrackId, TrackedIdentity>,
    counted: HashMap<TrackId, Category>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, observations: &[Observation]) -> TrackerDelta {
        let mut delta = TrackerDelta::default();
        let mut seen = HashSet::with_capacity(observations.len());

        for obs in observations {
            // untracked boxes cannot be deduplicated
            let Some(id) = obs.track_id else {
                continue;
            };

            seen.insert(id);

            if self.tracked.contains_key(&id) {
                self.observe_known(id, obs.category, &mut delta);
            } else {
                self.observe_new(id, obs.category, &mut delta);
            }
        }

        self.tracked.retain(|id, _| {
            if seen.contains(id) {
                true
            } else {
                delta.departed.push(*id);
                false
            }
        });
        delta.departed.sort_unstable();

        if delta.has_count_delta() || !delta.departed.is_empty() {
            debug!(
                "tracker delta: counted {:?}, transitions {:?}, departed {:?}",
                delta.newly_counted, delta.transitions, delta.departed
            );
        }

        delta
    }

    fn observe_new(&mut self, id: TrackId, category: Category, delta: &mut TrackerDelta) {
        let mut identity = TrackedIdentity::new(id, category);

        if category.is_counted() && !self.counted.contains_key(&id) {
            self.counted.insert(id, category);
            delta.newly_counted.push((id, category));
        }

        if identity.is_unsafe() {
            identity.alerted = true;
            delta.new_alerts.push(id);
        }

        self.tracked.insert(id, identity);
    }

    fn observe_known(&mut self, id: TrackId, category: Category, delta: &mut TrackerDelta) {
        let Some(identity) = self.tracked.get_mut(&id) else {
            unreachable!("identity {id} vanished from the live table");
        };

        identity.category = category;
        identity.status_text = category.status_text();

        // Unknown leaves the counters and the ledger alone; a later known
        // observation moves the unit from wherever the ledger put it.
        if category.is_counted() {
            match self.counted.get(&id).copied() {
                None => {
                    self.counted.insert(id, category);
                    delta.newly_counted.push((id, category));
                }
                Some(counted_as) if counted_as != category => {
                    delta.transitions.push(Transition {
                        track_id: id,
                        from: counted_as,
                        to: category,
                    });
                    self.counted.insert(id, category);
                }
                Some(_) => {}
            }
        }

        let safety = Safety::from(category);
        if identity.safety != safety {
            identity.safety = safety;

            match safety {
                Safety::Unsafe => {
                    identity.alerted = true;
                    delta.new_alerts.push(id);
                }
                Safety::Safe => identity.alerted = false,
            }
        }
    }

    #[inline]
    pub fn get(&self, id: TrackId) -> Option<&TrackedIdentity> {
        self.tracked.get(&id)
    }

    #[inline]
    pub fn is_tracked(&self, id: TrackId) -> bool {
        self.tracked.contains_key(&id)
    }

    #[inline]
    pub fn is_counted(&self, id: TrackId) -> bool {
        self.counted.contains_key(&id)
    }

    #[inline]
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    #[inline]
    pub fn counted_len(&self) -> usize {
        self.counted.len()
    }

    /// Number of visible identities whose last known state is unsafe.
    pub fn unsafe_count(&self) -> usize {
        self.tracked.values().filter(|t| t.is_unsafe()).count()
    }

    /// Copy of the live table ordered by track id.
    pub fn tracked(&self) -> Vec<TrackedIdentity> {
        let mut out: Vec<_> = self.tracked.values().cloned().collect();
        out.sort_unstable_by_key(|t| t.track_id);
        out
    }

    pub fn reset(&mut self) {
        self.tracked.clear();
        self.counted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: Option<TrackId>, category: Category) -> Observation {
        Observation {
            track_id: id,
            category,
        }
    }

    #[test]
    fn new_identity_is_counted_once() {
        let mut tracker = IdentityTracker::new();

        let delta = tracker.update(&[obs(Some(1), Category::WithMask)]);
        assert_eq!(delta.newly_counted, vec![(1, Category::WithMask)]);
        assert!(delta.new_alerts.is_empty());

        let delta = tracker.update(&[obs(Some(1), Category::WithMask)]);
        assert!(!delta.has_count_delta());
        assert_eq!(tracker.counted_len(), 1);
    }

    #[test]
    fn unsafe_arrival_alerts_immediately() {
        let mut tracker = IdentityTracker::new();

        let delta = tracker.update(&[obs(Some(3), Category::IncorrectMask)]);
        assert_eq!(delta.new_alerts, vec![3]);
        assert!(tracker.get(3).unwrap().alerted);
        assert_eq!(tracker.get(3).unwrap().status_text, "Incorrect Mask");
    }

    #[test]
    fn transition_moves_counter_and_toggles_alert() {
        let mut tracker = IdentityTracker::new();
        tracker.update(&[obs(Some(5), Category::WithMask)]);

        let delta = tracker.update(&[obs(Some(5), Category::WithoutMask)]);
        assert_eq!(
            delta.transitions,
            vec![Transition {
                track_id: 5,
                from: Category::WithMask,
                to: Category::WithoutMask
            }]
        );
        assert_eq!(delta.new_alerts, vec![5]);

        // unsafe -> unsafe of another kind: counter moves, no re-alert
        let delta = tracker.update(&[obs(Some(5), Category::IncorrectMask)]);
        assert_eq!(delta.transitions.len(), 1);
        assert!(delta.new_alerts.is_empty());
        assert!(tracker.get(5).unwrap().alerted);

        let delta = tracker.update(&[obs(Some(5), Category::WithMask)]);
        assert!(delta.new_alerts.is_empty());
        assert!(!tracker.get(5).unwrap().alerted);
        assert_eq!(tracker.counted_len(), 1);
    }

    #[test]
    fn departed_identity_stays_counted() {
        let mut tracker = IdentityTracker::new();
        tracker.update(&[obs(Some(1), Category::WithMask), obs(Some(2), Category::WithMask)]);

        let delta = tracker.update(&[obs(Some(2), Category::WithMask)]);
        assert_eq!(delta.departed, vec![1]);
        assert!(!tracker.is_tracked(1));
        assert!(tracker.is_counted(1));

        // reappearance is a fresh live entry but not a new count
        let delta = tracker.update(&[obs(Some(1), Category::WithoutMask)]);
        assert!(delta.newly_counted.is_empty());
        assert_eq!(delta.new_alerts, vec![1]);
        assert_eq!(delta.departed, vec![2]);
    }

    #[test]
    fn reappearance_then_change_moves_the_counted_unit() {
        let mut tracker = IdentityTracker::new();
        tracker.update(&[obs(Some(9), Category::WithMask)]);
        tracker.update(&[]);
        tracker.update(&[obs(Some(9), Category::WithoutMask)]);

        let delta = tracker.update(&[obs(Some(9), Category::IncorrectMask)]);
        assert_eq!(
            delta.transitions,
            vec![Transition {
                track_id: 9,
                from: Category::WithMask,
                to: Category::IncorrectMask
            }]
        );
    }

    #[test]
    fn untracked_and_unknown_are_not_counted() {
        let mut tracker = IdentityTracker::new();

        let delta = tracker.update(&[
            obs(None, Category::WithoutMask),
            obs(Some(4), Category::Unknown),
        ]);
        assert!(!delta.has_count_delta());
        assert!(delta.new_alerts.is_empty());
        assert_eq!(tracker.tracked_len(), 1);
        assert_eq!(tracker.counted_len(), 0);

        // counted at its first known observation
        let delta = tracker.update(&[obs(Some(4), Category::WithMask)]);
        assert_eq!(delta.newly_counted, vec![(4, Category::WithMask)]);
        assert!(delta.transitions.is_empty());

        // an unknown frame is a safe observation but leaves the counts
        let delta = tracker.update(&[obs(Some(4), Category::Unknown)]);
        assert!(!delta.has_count_delta());
        let identity = tracker.get(4).unwrap();
        assert_eq!(identity.category, Category::Unknown);
        assert_eq!(identity.safety, Safety::Safe);
        assert_eq!(identity.status_text, "");

        let delta = tracker.update(&[obs(Some(4), Category::WithMask)]);
        assert!(!delta.has_count_delta());
        assert_eq!(tracker.counted_len(), 1);
    }

    #[test]
    fn unknown_clears_alert_and_allows_realert() {
        let mut tracker = IdentityTracker::new();

        let delta = tracker.update(&[obs(Some(5), Category::WithoutMask)]);
        assert_eq!(delta.new_alerts, vec![5]);

        let delta = tracker.update(&[obs(Some(5), Category::Unknown)]);
        assert!(delta.new_alerts.is_empty());
        assert!(!tracker.get(5).unwrap().alerted);
        assert_eq!(tracker.unsafe_count(), 0);

        let delta = tracker.update(&[obs(Some(5), Category::WithoutMask)]);
        assert_eq!(delta.new_alerts, vec![5]);
        assert!(!delta.has_count_delta());
        assert_eq!(tracker.unsafe_count(), 1);
    }

    #[test]
    fn change_after_unknown_moves_the_counted_unit() {
        let mut tracker = IdentityTracker::new();
        tracker.update(&[obs(Some(6), Category::WithMask)]);
        tracker.update(&[obs(Some(6), Category::Unknown)]);

        let delta = tracker.update(&[obs(Some(6), Category::IncorrectMask)]);
        assert_eq!(
            delta.transitions,
            vec![Transition {
                track_id: 6,
                from: Category::WithMask,
                to: Category::IncorrectMask
            }]
        );
        assert_eq!(delta.new_alerts, vec![6]);
    }

    #[test]
    fn unsafe_count_reflects_live_table() {
        let mut tracker = IdentityTracker::new();
        tracker.update(&[
            obs(Some(1), Category::WithoutMask),
            obs(Some(2), Category::IncorrectMask),
            obs(Some(3), Category::WithMask),
        ]);
        assert_eq!(tracker.unsafe_count(), 2);

        tracker.reset();
        assert_eq!(tracker.unsafe_count(), 0);
        assert_eq!(tracker.counted_len(), 0);
        assert!(tracker.tracked().is_empty());
    }
}
