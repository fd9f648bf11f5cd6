//! Risk category classification
//!
//! Global invariants enforced:
//! - Deterministic classification
//! - Monotonic score-to-category mapping

use serde::{Deserialize, Serialize};

/// Risk category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskCategory {
    Low,      // <= 19
    Medium,   // 20-49
    High,     // 50-71
    Critical, // >= 72
    Unknown,
}

impl RiskCategory {
    /// Categories in chart order (Low -> Critical)
    pub const ORDERED: [RiskCategory; 4] = [
        RiskCategory::Low,
        RiskCategory::Medium,
        RiskCategory::High,
        RiskCategory::Critical,
    ];

    /// Display label, as written into the table and chart legend
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
            RiskCategory::Critical => "Critical",
            RiskCategory::Unknown => "Unknown",
        }
    }

    /// Normalized uppercase key used for chart bucketing and filtering
    pub fn key(&self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::High => "HIGH",
            RiskCategory::Critical => "CRITICAL",
            RiskCategory::Unknown => "UNKNOWN",
        }
    }

    /// CSS class for badges; empty for unknown
    pub fn css_class(&self) -> &'static str {
        match self {
            RiskCategory::Low => "risk-low",
            RiskCategory::Medium => "risk-medium",
            RiskCategory::High => "risk-high",
            RiskCategory::Critical => "risk-critical",
            RiskCategory::Unknown => "",
        }
    }
}

/// Upper bounds (inclusive) of each score band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub low_max: u32,
    pub medium_max: u32,
    pub high_max: u32,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        CategoryThresholds {
            low_max: 19,
            medium_max: 49,
            high_max: 71,
        }
    }
}

/// Chart and badge colors per category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPalette {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub critical: String,
    pub unknown: String,
}

impl Default for CategoryPalette {
    fn default() -> Self {
        CategoryPalette {
            low: "#16a34a".to_string(),
            medium: "#eab308".to_string(),
            high: "#f97316".to_string(),
            critical: "#dc2626".to_string(),
            unknown: "#94a3b8".to_string(),
        }
    }
}

impl CategoryPalette {
    pub fn color(&self, category: RiskCategory) -> &str {
        match category {
            RiskCategory::Low => &self.low,
            RiskCategory::Medium => &self.medium,
            RiskCategory::High => &self.high,
            RiskCategory::Critical => &self.critical,
            RiskCategory::Unknown => &self.unknown,
        }
    }
}

/// Assign category based on score with default thresholds
pub fn classify_score(score: u32) -> RiskCategory {
    classify_score_with_thresholds(score, &CategoryThresholds::default())
}

/// Assign category based on score with custom thresholds
pub fn classify_score_with_thresholds(score: u32, thresholds: &CategoryThresholds) -> RiskCategory {
    if score <= thresholds.low_max {
        RiskCategory::Low
    } else if score <= thresholds.medium_max {
        RiskCategory::Medium
    } else if score <= thresholds.high_max {
        RiskCategory::High
    } else {
        RiskCategory::Critical
    }
}

/// Classify a free-text category label by case-insensitive containment.
///
/// Checked most severe first, so "Medium-High" is High.
pub fn classify_label(label: &str) -> RiskCategory {
    let upper = label.trim().to_uppercase();
    if upper.is_empty() {
        return RiskCategory::Unknown;
    }
    [
        RiskCategory::Critical,
        RiskCategory::High,
        RiskCategory::Medium,
        RiskCategory::Low,
    ]
    .into_iter()
    .find(|category| upper.contains(category.key()))
    .unwrap_or(RiskCategory::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_boundaries() {
        assert_eq!(classify_score(0), RiskCategory::Low);
        assert_eq!(classify_score(19), RiskCategory::Low);
        assert_eq!(classify_score(20), RiskCategory::Medium);
        assert_eq!(classify_score(49), RiskCategory::Medium);
        assert_eq!(classify_score(50), RiskCategory::High);
        assert_eq!(classify_score(71), RiskCategory::High);
        assert_eq!(classify_score(72), RiskCategory::Critical);
        assert_eq!(classify_score(u32::MAX), RiskCategory::Critical);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = CategoryThresholds {
            low_max: 5,
            medium_max: 10,
            high_max: 15,
        };
        assert_eq!(classify_score_with_thresholds(6, &thresholds), RiskCategory::Medium);
        assert_eq!(classify_score_with_thresholds(16, &thresholds), RiskCategory::Critical);
    }

    #[test]
    fn test_label_containment_is_case_insensitive() {
        assert_eq!(classify_label("critical"), RiskCategory::Critical);
        assert_eq!(classify_label("  High Risk "), RiskCategory::High);
        assert_eq!(classify_label("MEDIUM"), RiskCategory::Medium);
        assert_eq!(classify_label("low"), RiskCategory::Low);
    }

    #[test]
    fn test_label_prefers_most_severe_match() {
        assert_eq!(classify_label("Medium-High"), RiskCategory::High);
        assert_eq!(classify_label("low to critical"), RiskCategory::Critical);
    }

    #[test]
    fn test_unmatched_label_is_unknown() {
        assert_eq!(classify_label(""), RiskCategory::Unknown);
        assert_eq!(classify_label("moderate"), RiskCategory::Unknown);
    }

    #[test]
    fn test_ordered_excludes_unknown() {
        assert!(!RiskCategory::ORDERED.contains(&RiskCategory::Unknown));
        assert_eq!(RiskCategory::ORDERED[0], RiskCategory::Low);
    }

    #[test]
    fn test_palette_colors() {
        let palette = CategoryPalette::default();
        assert_eq!(palette.color(RiskCategory::Critical), "#dc2626");
        assert_eq!(palette.color(RiskCategory::Low), "#16a34a");
    }
}
