//! Tests that drive the riskshare binary

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn riskshare() -> Command {
    Command::new(env!("CARGO_BIN_EXE_riskshare"))
}

#[test]
fn test_generate_writes_report() {
    let temp = TempDir::new().unwrap();
    let output_path = temp.path().join("out").join("report.html");

    let output = riskshare()
        .args(["generate", fixture_path("assessment.json").to_str().unwrap()])
        .args(["--output", output_path.to_str().unwrap()])
        .args(["--title", "Dock 4"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let html = fs::read_to_string(&output_path).unwrap();
    assert!(html.contains("<title>Dock 4</title>"));
    assert!(!output_path.with_extension("html.tmp").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Total tasks: 3"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Report written to:"));
}

#[test]
fn test_generate_with_projections_flag() {
    let temp = TempDir::new().unwrap();
    let output_path = temp.path().join("report.html");

    let output = riskshare()
        .args(["generate", fixture_path("assessment.json").to_str().unwrap()])
        .args(["--output", output_path.to_str().unwrap()])
        .arg("--projections")
        .output()
        .unwrap();

    assert!(output.status.success());
    let html = fs::read_to_string(&output_path).unwrap();
    assert!(html.contains("<th>Projected Score</th>"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("PROJECTED"));
}

#[test]
fn test_generate_empty_table_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let output_path = temp.path().join("report.html");

    let output = riskshare()
        .args(["generate", fixture_path("empty.json").to_str().unwrap()])
        .args(["--output", output_path.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!output_path.exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nothing written"));
}

#[test]
fn test_generate_missing_table_fails() {
    let temp = TempDir::new().unwrap();
    let output = riskshare()
        .args(["generate", temp.path().join("nope.json").to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_project_json() {
    let temp = TempDir::new().unwrap();
    let output = riskshare()
        .args(["project", "--score", "80"])
        .args(["--control", "Engineer", "--control", "admin"])
        .args(["--format", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["currentScore"], 80);
    assert_eq!(json["projectedScore"], 25);
    assert_eq!(json["reductionPercent"], 69);
}

#[test]
fn test_project_text_with_eliminate() {
    let temp = TempDir::new().unwrap();
    let output = riskshare()
        .args(["project", "--score", "55", "--control", "Eliminate"])
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Projected score: 0 (Low)"));
    assert!(stdout.contains("Reduction:       100%"));
}

#[test]
fn test_config_validate_rejects_bad_values() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("riskshare.config.json");
    fs::write(&config_path, r#"{"images": {"jpeg_quality": 0}}"#).unwrap();

    let output = riskshare()
        .args(["config", "validate"])
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("jpeg_quality"));
}

#[test]
fn test_config_show_reports_source() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".risksharerc.json"),
        r#"{"title": "Night Shift"}"#,
    )
    .unwrap();

    let output = riskshare()
        .args(["config", "show"])
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(".risksharerc.json"));
    assert!(stdout.contains("title: Night Shift"));
    assert!(stdout.contains("low_max: 19"));
}
