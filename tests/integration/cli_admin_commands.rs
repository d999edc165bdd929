#![allow(missing_docs)]

use std::fs;

use assert_cmd::Command;
use tempfile::TempDir;

/// Every invocation gets its own `XDG_CACHE_HOME` so the default cache
/// location (`ServiceConfig::default()`, used when `--config` is omitted)
/// never touches a real user cache directory.
fn cmd(cache_home: &std::path::Path) -> Command {
    let mut command = Command::cargo_bin("nodebridge").expect("nodebridge binary");
    command.env("XDG_CACHE_HOME", cache_home);
    command
}

#[test]
fn cache_stats_on_an_empty_cache_reports_zero_hit_rate() {
    let cache_home = TempDir::new().expect("tempdir");

    let output = cmd(cache_home.path()).args(["cache", "stats"]).output().expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.contains("cache"));
}

#[test]
fn cache_stats_json_output_is_well_formed() {
    let cache_home = TempDir::new().expect("tempdir");

    let output = cmd(cache_home.path())
        .args(["--format", "json", "cache", "stats"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(parsed["misses"], 0);
}

#[test]
fn cache_invalidate_on_a_missing_file_key_succeeds_with_zero_removed() {
    let cache_home = TempDir::new().expect("tempdir");

    let output = cmd(cache_home.path())
        .args(["cache", "invalidate", "NOSUCHFILE"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.contains("invalidated 0 entries"));
}

#[test]
fn plan_over_a_json_fixture_prints_a_tiered_task_list() {
    let cache_home = TempDir::new().expect("tempdir");
    let fixture_dir = TempDir::new().expect("tempdir");
    let fixture_path = fixture_dir.path().join("node.json");
    fs::write(
        &fixture_path,
        r#"{
            "id": "1:1",
            "name": "Screen",
            "kind": "Frame",
            "bbox": {"x": 0.0, "y": 0.0, "w": 375.0, "h": 812.0},
            "rotation": 0.0,
            "fills": [],
            "strokes": [],
            "stroke_weight": 0.0,
            "effects": [],
            "opacity": 1.0,
            "corner_radius": null,
            "corner_radii": null,
            "layout_mode": "None",
            "padding": {"top": 0.0, "right": 0.0, "bottom": 0.0, "left": 0.0},
            "gap": 0.0,
            "axis_align": null,
            "sizing": null,
            "text_content": null,
            "typography": null,
            "component_id": null,
            "children": [
                {
                    "id": "1:2",
                    "name": "Title",
                    "kind": "Text",
                    "bbox": null,
                    "rotation": 0.0,
                    "fills": [],
                    "strokes": [],
                    "stroke_weight": 0.0,
                    "effects": [],
                    "opacity": 1.0,
                    "corner_radius": null,
                    "corner_radii": null,
                    "layout_mode": "None",
                    "padding": {"top": 0.0, "right": 0.0, "bottom": 0.0, "left": 0.0},
                    "gap": 0.0,
                    "axis_align": null,
                    "sizing": null,
                    "text_content": "Welcome",
                    "typography": null,
                    "component_id": null,
                    "children": []
                }
            ]
        }"#,
    )
    .expect("write fixture");

    let output = cmd(cache_home.path())
        .args(["plan", fixture_path.to_str().unwrap()])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.contains("tasks"));
}

#[test]
fn plan_over_a_missing_fixture_fails_with_a_nonzero_exit_code() {
    let cache_home = TempDir::new().expect("tempdir");

    let output = cmd(cache_home.path())
        .args(["plan", "/no/such/fixture.json"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}
