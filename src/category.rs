use serde_derive::{Deserialize, Serialize};

const WITHOUT_MASK_PATTERNS: &[&str] = &["no_mask", "without_mask", "not_wearing", "no mask"];
const INCORRECT_MASK_PATTERNS: &[&str] = &["incorrect", "improper", "mask_weared_incorrect"];
const WITH_MASK_PATTERNS: &[&str] = &["mask", "with_mask", "wearing_mask"];

/// Compliance category of a single detection.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    WithMask,
    WithoutMask,
    IncorrectMask,
    Unknown,
}

impl Category {
    #[inline]
    pub fn is_unsafe(&self) -> bool {
        matches!(self, Category::WithoutMask | Category::IncorrectMask)
    }

    /// Unknown never contributes to the cumulative counters.
    #[inline]
    pub fn is_counted(&self) -> bool {
        !matches!(self, Category::Unknown)
    }

    pub fn status_text(&self) -> &'static str {
        match self {
            Category::WithMask => "Mask OK",
            Category::WithoutMask => "No Mask",
            Category::IncorrectMask => "Incorrect Mask",
            Category::Unknown => "",
        }
    }
}

/// Maps a raw class label to a category.
///
/// Matching is case-insensitive and by substring. The defective categories are
/// tested before the generic "mask" rule, otherwise labels like
/// `mask_weared_incorrect` would be classified as `WithMask`.
pub fn classify(label: &str) -> Category {
    let label = label.to_lowercase();
    let matches_any = |patterns: &[&str]| patterns.iter().any(|p| label.contains(p));

    if matches_any(WITHOUT_MASK_PATTERNS) {
        Category::WithoutMask
    } else if matches_any(INCORRECT_MASK_PATTERNS) {
        Category::IncorrectMask
    } else if matches_any(WITH_MASK_PATTERNS) {
        Category::WithMask
    } else {
        Category::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_labels_win_over_generic_mask() {
        assert_eq!(classify("without_mask"), Category::WithoutMask);
        assert_eq!(classify("No Mask"), Category::WithoutMask);
        assert_eq!(classify("person_not_wearing"), Category::WithoutMask);
        assert_eq!(classify("mask_weared_incorrect"), Category::IncorrectMask);
        assert_eq!(classify("Improper"), Category::IncorrectMask);
    }

    #[test]
    fn positive_and_unknown() {
        assert_eq!(classify("with_mask"), Category::WithMask);
        assert_eq!(classify("MASK"), Category::WithMask);
        assert_eq!(classify("wearing_mask"), Category::WithMask);
        assert_eq!(classify("person"), Category::Unknown);
        assert_eq!(classify(""), Category::Unknown);
    }

    #[test]
    fn safety() {
        assert!(Category::WithoutMask.is_unsafe());
        assert!(Category::IncorrectMask.is_unsafe());
        assert!(!Category::WithMask.is_unsafe());
        assert!(!Category::Unknown.is_unsafe());
        assert!(!Category::Unknown.is_counted());
    }
}
