use serde_derive::{Deserialize, Serialize};

use crate::category::{classify, Category};

/// Identifier assigned by the upstream tracker, stable for as long as tracking continuity holds.
pub type TrackId = i32;

/// One detected box of a frame, as produced by the detector/tracker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    #[serde(rename = "c")]
    pub label: String,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, track_id: Option<TrackId>) -> Self {
        Self {
            label: label.into(),
            confidence,
            track_id,
        }
    }

    #[inline]
    pub fn tracked(label: impl Into<String>, track_id: TrackId) -> Self {
        Self::new(label, 1.0, Some(track_id))
    }

    #[inline]
    pub fn untracked(label: impl Into<String>) -> Self {
        Self::new(label, 1.0, None)
    }

    #[inline(always)]
    pub fn category(&self) -> Category {
        classify(&self.label)
    }
}
