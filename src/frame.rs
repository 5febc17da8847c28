use serde_derive::{Deserialize, Serialize};

use crate::detection::Detection;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Frame {
    pub detections: Vec<Detection>,
    pub timestamp: f32, // in seconds
}

impl Frame {
    #[inline]
    pub fn new(timestamp: f32, detections: Vec<Detection>) -> Self {
        Self {
            detections,
            timestamp,
        }
    }
}
