use serde_derive::{Deserialize, Serialize};

use crate::detection::TrackId;

/// More unsafe people than this in one frame makes the environment unsafe.
pub const DEFAULT_UNSAFE_THRESHOLD: usize = 2;

/// Alert payload of one processed frame, used to drive overlays and banners.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameAlert {
    pub new_alerts: Vec<TrackId>,
    pub unsafe_count: usize,
    pub environment_unsafe: bool,
}

#[inline]
pub fn is_environment_unsafe(unsafe_count: usize, threshold: usize) -> bool {
    unsafe_count > threshold
}

pub fn evaluate(unsafe_count: usize, new_alerts: Vec<TrackId>, threshold: usize) -> FrameAlert {
    FrameAlert {
        new_alerts,
        unsafe_count,
        environment_unsafe: is_environment_unsafe(unsafe_count, threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        assert!(!evaluate(2, vec![], DEFAULT_UNSAFE_THRESHOLD).environment_unsafe);
        assert!(evaluate(3, vec![], DEFAULT_UNSAFE_THRESHOLD).environment_unsafe);
    }

    #[test]
    fn alerts_are_passed_through() {
        let alert = evaluate(1, vec![4, 9], DEFAULT_UNSAFE_THRESHOLD);
        assert_eq!(alert.new_alerts, vec![4, 9]);
        assert_eq!(alert.unsafe_count, 1);
    }
}
