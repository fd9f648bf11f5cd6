//! End-to-end tests: table export -> prepared records -> HTML

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use riskshare_core::report::category_distribution;
use riskshare_core::table::{self, ImageNameMap};
use riskshare_core::{config, generate_report, prepare_report, JsonTableSource, ResolvedConfig};
use riskshare_core::{ControlType, RiskCategory};
use std::path::PathBuf;

// 2026-10-16 14:05 UTC
const GENERATED_AT: i64 = 1_792_159_500;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> JsonTableSource {
    JsonTableSource::from_path(&fixture_path(name)).unwrap()
}

fn decode_jpeg(uri: &str) -> image::DynamicImage {
    let encoded = uri
        .strip_prefix("data:image/jpeg;base64,")
        .expect("normalized images are JPEG data URIs");
    let bytes = BASE64_STANDARD.decode(encoded).unwrap();
    image::load_from_memory(&bytes).unwrap()
}

#[test]
fn test_empty_table_renders_nothing() {
    let source = load_fixture("empty.json");
    let html = generate_report(
        &source,
        &ImageNameMap::new(),
        &ResolvedConfig::defaults(),
        GENERATED_AT,
    );
    assert_eq!(html, "");
}

#[test]
fn test_deleted_rows_and_editor_columns_are_dropped() {
    let source = load_fixture("assessment.json");
    let prepared = prepare_report(&source, &ImageNameMap::new(), &ResolvedConfig::defaults());

    assert_eq!(
        prepared.headers,
        vec!["Steps", "Picture", "Hazards", "Risk Category", "Risk Score"]
    );
    assert_eq!(prepared.records.len(), 3);
    let steps: Vec<&str> = prepared
        .records
        .iter()
        .map(|r| r.get("Steps").unwrap())
        .collect();
    assert_eq!(steps, vec!["Load pallets", "Sweep floor", "Cut sheet metal"]);
    for record in &prepared.records {
        assert!(record.get("AI").is_none());
        assert!(record.get("Delete").is_none());
    }
    let indices: Vec<usize> = prepared.records.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
}

#[test]
fn test_cells_flatten_to_display_text() {
    let source = load_fixture("assessment.json");
    let prepared = prepare_report(&source, &ImageNameMap::new(), &ResolvedConfig::defaults());

    assert_eq!(prepared.records[0].get("Hazards"), Some("Crush injury"));
    assert_eq!(prepared.records[1].get("Hazards"), Some("Slip hazard"));
    assert_eq!(prepared.records[2].get("Hazards"), Some("Lacerations"));
}

#[test]
fn test_large_image_is_resized_to_bounding_box() {
    let source = load_fixture("assessment.json");
    let prepared = prepare_report(&source, &ImageNameMap::new(), &ResolvedConfig::defaults());

    let record = &prepared.records[0];
    let url = record.image_url.as_deref().unwrap();
    let decoded = decode_jpeg(url);
    assert_eq!((decoded.width(), decoded.height()), (800, 320));
    assert_eq!(record.get("Picture"), Some(url));
    assert_eq!(record.image_name.as_deref(), Some("image_1.jpg"));
}

#[test]
fn test_image_names_come_from_name_map() {
    let source = load_fixture("assessment.json");
    let names = table::load_image_names(&fixture_path("image-names.json")).unwrap();
    let prepared = prepare_report(&source, &names, &ResolvedConfig::defaults());

    assert_eq!(
        prepared.records[0].image_name.as_deref(),
        Some("forklift-bay-3.jpg")
    );
}

#[test]
fn test_corrupt_image_does_not_fail_batch() {
    let source = load_fixture("assessment.json");
    let prepared = prepare_report(&source, &ImageNameMap::new(), &ResolvedConfig::defaults());

    // Row 3 references a corrupt file; it keeps its data, minus the image
    let record = &prepared.records[2];
    assert!(record.image_url.is_none());
    assert_eq!(record.get("Picture"), Some(""));
    assert_eq!(record.get("Steps"), Some("Cut sheet metal"));
    assert!(prepared.records[0].image_url.is_some());
}

#[test]
fn test_row_without_image_gets_placeholder() {
    let source = load_fixture("assessment.json");
    let html = generate_report(
        &source,
        &ImageNameMap::new(),
        &ResolvedConfig::defaults(),
        GENERATED_AT,
    );

    let sweep_row = html
        .lines()
        .find(|l| l.contains("<tr data-index=\"1\""))
        .unwrap();
    assert!(sweep_row.contains(r#"<td class="text-center text-slate-400">—</td>"#));
    assert!(sweep_row.contains("<td>Sweep floor</td>"));
    assert!(sweep_row.contains("<td>Slip hazard</td>"));
    assert!(sweep_row.contains("<td>10</td>"));
}

#[test]
fn test_blank_category_derived_from_score() {
    let source = load_fixture("assessment.json");
    let prepared = prepare_report(&source, &ImageNameMap::new(), &ResolvedConfig::defaults());

    let record = &prepared.records[2];
    assert_eq!(record.category, RiskCategory::Critical);
    assert_eq!(record.get("Risk Category"), Some("Critical"));
    assert_eq!(
        category_distribution(&prepared.records),
        vec![
            (RiskCategory::Low, 1),
            (RiskCategory::High, 1),
            (RiskCategory::Critical, 1),
        ]
    );
}

#[test]
fn test_controls_accept_both_input_shapes() {
    let source = load_fixture("assessment.json");
    let prepared = prepare_report(&source, &ImageNameMap::new(), &ResolvedConfig::defaults());

    let controls = &prepared.records[0].controls;
    assert_eq!(controls.len(), 2);
    assert_eq!(controls[0].control_type, ControlType::Engineer);
    assert_eq!(controls[0].description, "Install guard rail");
    assert_eq!(controls[1].control_type, ControlType::Admin);
    assert_eq!(controls[1].description, "");
}

#[test]
fn test_projections_end_to_end() {
    let source = load_fixture("assessment.json");
    let mut config = ResolvedConfig::defaults();
    config.include_projections = true;
    let prepared = prepare_report(&source, &ImageNameMap::new(), &config);

    // 60 * (1 - 0.55) * (1 - 0.30) = 18.9
    let p = prepared.records[0].projection.unwrap();
    assert_eq!(p.projected_score, 19);
    assert_eq!(p.reduction_percent, 68);

    let p = prepared.records[1].projection.unwrap();
    assert_eq!(p.projected_score, 10);
    assert_eq!(p.reduction_percent, 0);

    let p = prepared.records[2].projection.unwrap();
    assert_eq!(p.projected_score, 0);
    assert_eq!(p.reduction_percent, 100);

    let html = generate_report(&source, &ImageNameMap::new(), &config, GENERATED_AT);
    assert!(html.contains("<th>Projected Score</th>"));
    assert!(html.contains(r#"id="evolutionChart""#));
    assert!(html.contains("<td>68%</td>"));
}

#[test]
fn test_report_is_deterministic() {
    let source = load_fixture("assessment.json");
    let config = ResolvedConfig::defaults();
    let first = generate_report(&source, &ImageNameMap::new(), &config, GENERATED_AT);
    let second = generate_report(&source, &ImageNameMap::new(), &config, GENERATED_AT);
    assert_eq!(first, second);
    assert!(first.contains("October 16, 2026, 14:05 UTC"));
    assert!(first.contains("Total Tasks: <strong>3</strong>"));
    assert!(!first.contains("Old step"));
}

#[test]
fn test_config_next_to_table_is_applied() {
    let table_path = fixture_path("configured/table.json");
    let config = config::load_and_resolve(table_path.parent().unwrap(), None).unwrap();
    assert!(config.config_path.is_some());
    assert_eq!(config.title, "Warehouse Assessment");
    assert!(config.include_projections);

    let source = JsonTableSource::from_path(&table_path).unwrap();
    let prepared = prepare_report(&source, &ImageNameMap::new(), &config);
    let record = &prepared.records[0];

    // 45 sits in High once high starts at 40
    assert_eq!(record.category, RiskCategory::High);
    assert_eq!(record.get("Risk Category"), Some("High"));

    // Substitute alone hits the 0.35 floor: 45 * 0.35 = 15.75
    let p = record.projection.unwrap();
    assert_eq!(p.projected_score, 16);
    assert_eq!(p.projected_category(&config.thresholds), RiskCategory::Medium);

    let decoded = decode_jpeg(record.image_url.as_deref().unwrap());
    assert_eq!((decoded.width(), decoded.height()), (200, 80));

    let html = generate_report(&source, &ImageNameMap::new(), &config, GENERATED_AT);
    assert!(html.contains("<title>Warehouse Assessment</title>"));
}

#[test]
fn test_mixed_type_cells_and_malformed_controls_still_report() {
    let source = JsonTableSource::from_json(
        r#"{
            "headers": ["Steps", "Hazards", "Risk Category", "Risk Score"],
            "rows": [{
                "cells": ["Lift crates", null, null, 40],
                "controls": [{"description": "no type"}, 7, null, "Engineer", {"controlType": null}]
            }]
        }"#,
        None,
    )
    .unwrap();
    let mut config = ResolvedConfig::defaults();
    config.include_projections = true;

    let prepared = prepare_report(&source, &ImageNameMap::new(), &config);
    let record = &prepared.records[0];
    assert_eq!(record.controls.len(), 5);
    assert_eq!(record.category, RiskCategory::Medium);
    assert_eq!(record.get("Risk Category"), Some("Medium"));

    // Only Engineer counts: 40 * (1 - 0.55) = 18
    let p = record.projection.unwrap();
    assert_eq!(p.current_score, 40);
    assert_eq!(p.projected_score, 18);
    assert_eq!(p.reduction_percent, 55);

    let html = generate_report(&source, &ImageNameMap::new(), &config, GENERATED_AT);
    let row = html
        .lines()
        .find(|l| l.contains("<tr data-index=\"0\""))
        .unwrap();
    assert!(row.contains("<td>Lift crates</td><td>—</td>"));
    assert!(row.contains("<td>40</td>"));
}
