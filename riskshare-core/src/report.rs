//! Record annotation and plain-text/JSON summaries
//!
//! Global invariants enforced:
//! - Record order is the visible row order of the source table
//! - Category distribution is always reported Low -> Critical, Unknown last

use crate::config::ResolvedConfig;
use crate::projection::{project_with_params, parse_score, Projection};
use crate::risk::{classify_label, classify_score_with_thresholds, CategoryThresholds, RiskCategory};
use crate::table::RowRecord;

/// Assign each record its category and, when enabled, its projection.
///
/// A blank category cell is filled from the score column when one exists.
pub fn annotate_records(records: &mut [RowRecord], config: &ResolvedConfig) {
    let columns = &config.columns;
    for record in records.iter_mut() {
        let label = record.get(&columns.category).unwrap_or("").trim().to_string();
        let score_text = record.get(&columns.score).map(str::to_string);

        record.category = if !label.is_empty() {
            classify_label(&label)
        } else if let Some(text) = score_text.as_deref().filter(|s| !s.trim().is_empty()) {
            let derived = classify_score_with_thresholds(parse_score(text), &config.thresholds);
            record.set(&columns.category, derived.as_str().to_string());
            derived
        } else {
            RiskCategory::Unknown
        };

        if config.include_projections {
            let current = score_text.as_deref().map(parse_score).unwrap_or(0);
            record.projection = Some(project_with_params(
                current,
                &record.controls,
                &config.effectiveness,
                &config.projection,
            ));
        }
    }
}

/// Count records per category, Low -> Critical, with Unknown last if present
pub fn category_distribution(records: &[RowRecord]) -> Vec<(RiskCategory, usize)> {
    count_categories(records.iter().map(|r| r.category))
}

/// Distribution of projected categories; empty when no record has a projection
pub fn projected_distribution(
    records: &[RowRecord],
    thresholds: &CategoryThresholds,
) -> Vec<(RiskCategory, usize)> {
    count_categories(
        records
            .iter()
            .filter_map(|r| r.projection.as_ref())
            .map(|p| p.projected_category(thresholds)),
    )
}

fn count_categories(categories: impl Iterator<Item = RiskCategory>) -> Vec<(RiskCategory, usize)> {
    let mut counts = [0usize; 5];
    for category in categories {
        counts[slot(category)] += 1;
    }
    RiskCategory::ORDERED
        .into_iter()
        .chain(std::iter::once(RiskCategory::Unknown))
        .map(|c| (c, counts[slot(c)]))
        .filter(|(_, n)| *n > 0)
        .collect()
}

fn slot(category: RiskCategory) -> usize {
    match category {
        RiskCategory::Low => 0,
        RiskCategory::Medium => 1,
        RiskCategory::High => 2,
        RiskCategory::Critical => 3,
        RiskCategory::Unknown => 4,
    }
}

/// Render a short distribution summary
pub fn render_text_summary(records: &[RowRecord], thresholds: &CategoryThresholds) -> String {
    let mut output = String::new();
    output.push_str(&format!("{:<10} {}\n", "CATEGORY", "TASKS"));
    for (category, count) in category_distribution(records) {
        output.push_str(&format!("{:<10} {}\n", category.as_str(), count));
    }

    let projected = projected_distribution(records, thresholds);
    if !projected.is_empty() {
        output.push_str(&format!("\n{:<10} {}\n", "PROJECTED", "TASKS"));
        for (category, count) in projected {
            output.push_str(&format!("{:<10} {}\n", category.as_str(), count));
        }
    }

    output.push_str(&format!("\nTotal tasks: {}\n", records.len()));
    output
}

/// Render a single projection as text
pub fn render_projection_text(projection: &Projection, thresholds: &CategoryThresholds) -> String {
    format!(
        "Current score:   {} ({})\nProjected score: {} ({})\nReduction:       {}%\nHard multiplier: {:.3}\nSoft multiplier: {:.3}\n",
        projection.current_score,
        projection.current_category(thresholds).as_str(),
        projection.projected_score,
        projection.projected_category(thresholds).as_str(),
        projection.reduction_percent,
        projection.hard_multiplier,
        projection.soft_multiplier,
    )
}

/// Render a single projection as JSON
pub fn render_projection_json(projection: &Projection) -> String {
    serde_json::to_string_pretty(projection).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Control, ControlType};

    fn record(values: &[(&str, &str)], controls: Vec<Control>) -> RowRecord {
        RowRecord {
            index: 1,
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            image_url: None,
            image_name: None,
            controls,
            category: RiskCategory::Unknown,
            projection: None,
        }
    }

    #[test]
    fn test_annotate_uses_label_first() {
        let mut records = vec![record(&[("Risk Category", "high"), ("Risk Score", "5")], vec![])];
        annotate_records(&mut records, &ResolvedConfig::defaults());
        assert_eq!(records[0].category, RiskCategory::High);
        assert_eq!(records[0].get("Risk Category"), Some("high"));
        assert!(records[0].projection.is_none());
    }

    #[test]
    fn test_annotate_derives_blank_category_from_score() {
        let mut records = vec![record(&[("Risk Category", " "), ("Risk Score", "72")], vec![])];
        annotate_records(&mut records, &ResolvedConfig::defaults());
        assert_eq!(records[0].category, RiskCategory::Critical);
        assert_eq!(records[0].get("Risk Category"), Some("Critical"));
    }

    #[test]
    fn test_annotate_without_label_or_score_is_unknown() {
        let mut records = vec![record(&[("Steps", "Mop")], vec![])];
        annotate_records(&mut records, &ResolvedConfig::defaults());
        assert_eq!(records[0].category, RiskCategory::Unknown);
    }

    #[test]
    fn test_annotate_projections() {
        let mut config = ResolvedConfig::defaults();
        config.include_projections = true;
        let controls = vec![
            Control::new(ControlType::Engineer, "Guard rail"),
            Control::new(ControlType::Admin, "Permit"),
        ];
        let mut records = vec![
            record(&[("Risk Score", "80")], controls),
            record(&[("Risk Score", "n/a")], vec![]),
        ];
        annotate_records(&mut records, &config);

        let p = records[0].projection.unwrap();
        assert_eq!(p.projected_score, 25);
        assert_eq!(p.reduction_percent, 69);
        let p = records[1].projection.unwrap();
        assert_eq!(p.current_score, 0);
        assert_eq!(p.projected_score, 0);
    }

    #[test]
    fn test_distribution_order() {
        let mut records = vec![
            record(&[("Risk Category", "Critical")], vec![]),
            record(&[("Risk Category", "Low")], vec![]),
            record(&[("Risk Category", "odd")], vec![]),
            record(&[("Risk Category", "critical")], vec![]),
        ];
        annotate_records(&mut records, &ResolvedConfig::defaults());
        assert_eq!(
            category_distribution(&records),
            vec![
                (RiskCategory::Low, 1),
                (RiskCategory::Critical, 2),
                (RiskCategory::Unknown, 1),
            ]
        );
    }

    #[test]
    fn test_text_summary() {
        let mut config = ResolvedConfig::defaults();
        config.include_projections = true;
        let mut records = vec![record(
            &[("Risk Score", "60")],
            vec![Control::new(ControlType::Eliminate, "")],
        )];
        annotate_records(&mut records, &config);
        let text = render_text_summary(&records, &config.thresholds);
        assert!(text.contains("High"));
        assert!(text.contains("PROJECTED"));
        assert!(text.contains("Total tasks: 1"));
    }
}
