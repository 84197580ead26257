use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const JERUSALEM: [&str; 6] = ["--lat", "31.778", "--lon", "35.235", "--utc-offset", "+02:00"];

fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("basic.json"),
        r#"{
  "zmanim": [
    {"key": "shkia", "formula": "sunset"},
    {"key": "alos", "formula": "solar(16.1, before_sunrise)"},
    {"key": "sof_zman_shema", "formula": "proportional_hours(3, gra)"},
    {"key": "shaah", "formula": "shaah_zmanis(gra)"},
    {
      "key": "candle_lighting",
      "formula": "sunset - 40min",
      "tags": [{"tag_key": "erev_shabbos", "tag_type": "event"}],
      "rounding": "floor"
    }
  ]
}"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("events.json"),
        r#"{
  "event_patterns": [
    {"pattern": "Erev Shabbat", "tag_key": "erev_shabbos"},
    {"pattern": "Chanukah%", "tag_key": "chanukah", "priority": 1}
  ]
}"#,
    )
    .unwrap();
    temp_dir
}

fn zmanim() -> Command {
    Command::cargo_bin("zmanim").unwrap()
}

#[test]
fn test_cli_run_prints_table() {
    let temp_dir = workspace();

    zmanim()
        .arg("run")
        .arg("--dir")
        .arg(temp_dir.path())
        .args(["--date", "2024-03-20"])
        .args(JERUSALEM)
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-20 · no active events"))
        .stdout(predicate::str::contains("shkia"))
        .stdout(predicate::str::contains("sof_zman_shema"))
        .stdout(predicate::str::contains("+02:00"))
        .stdout(predicate::str::contains("Not today: candle_lighting"));
}

#[test]
fn test_cli_run_raw_selected_keys() {
    let temp_dir = workspace();

    zmanim()
        .args(["run", "shkia", "shaah", "--raw", "--date", "2024-03-20"])
        .arg("--dir")
        .arg(temp_dir.path())
        .args(JERUSALEM)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("shkia\t17:5"))
        .stdout(predicate::str::contains("shaah\t1h"))
        .stdout(predicate::str::contains("alos").not());
}

#[test]
fn test_cli_run_event_title_enables_tagged_zman() {
    let temp_dir = workspace();

    zmanim()
        .args(["run", "candle_lighting", "--raw", "--date", "2024-03-22"])
        .args(["--event", "Erev Shabbat"])
        .arg("--dir")
        .arg(temp_dir.path())
        .args(JERUSALEM)
        .assert()
        .success()
        .stdout(predicate::str::contains("candle_lighting\t17:"));
}

#[test]
fn test_cli_run_json_output() {
    let temp_dir = workspace();

    let output = zmanim()
        .args(["run", "--json", "--weekdays", "--date", "2024-03-22"])
        .arg("--dir")
        .arg(temp_dir.path())
        .args(JERUSALEM)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["date"], "2024-03-22");
    assert_eq!(json["active_events"], serde_json::json!(["erev_shabbos"]));
    assert_eq!(json["excluded"], serde_json::json!([]));

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results[0]["key"], "shkia");
    assert_eq!(results[0]["type"], "time");
    assert_eq!(results[3]["type"], "duration");
}

#[test]
fn test_cli_run_negative_coordinates() {
    let temp_dir = workspace();

    zmanim()
        .args(["run", "shkia", "--raw", "--date", "2024-06-21"])
        .args(["--lat", "40.0828", "--lon", "-74.2094", "--utc-offset", "-04:00"])
        .arg("--dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("shkia\t20:"));
}

#[test]
fn test_cli_run_unknown_key() {
    let temp_dir = workspace();

    zmanim()
        .args(["run", "nonexistent", "--date", "2024-03-20"])
        .arg("--dir")
        .arg(temp_dir.path())
        .args(JERUSALEM)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_run_reports_formula_errors_in_place() {
    let temp_dir = workspace();
    fs::write(
        temp_dir.path().join("broken.json"),
        r#"{"zmanim": [{"key": "loop", "formula": "@loop + 1min"}]}"#,
    )
    .unwrap();

    zmanim()
        .args(["run", "--raw", "--date", "2024-03-20"])
        .arg("--dir")
        .arg(temp_dir.path())
        .args(JERUSALEM)
        .assert()
        .success()
        .stdout(predicate::str::contains("loop\tCycle error: loop -> loop"))
        .stdout(predicate::str::contains("shkia\t17:5"));
}

#[test]
fn test_cli_duplicate_key_across_files() {
    let temp_dir = workspace();
    fs::write(
        temp_dir.path().join("more.json"),
        r#"{"zmanim": [{"key": "shkia", "formula": "sunset + 1min"}]}"#,
    )
    .unwrap();

    zmanim()
        .args(["run", "--date", "2024-03-20"])
        .arg("--dir")
        .arg(temp_dir.path())
        .args(JERUSALEM)
        .assert()
        .failure()
        .stderr(predicate::str::contains("more.json"))
        .stderr(predicate::str::contains("shkia"));
}

#[test]
fn test_cli_check_prints_canonical_formula() {
    zmanim()
        .args(["check", "sunrise-72 minutes"])
        .assert()
        .success()
        .stdout("sunrise - 72min\n");
}

#[test]
fn test_cli_check_renders_errors() {
    zmanim()
        .args(["check", "sunrise + sunset"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot add two times"))
        .stderr(predicate::str::contains("time2 - time1"));

    zmanim()
        .args(["check", "coalesce(sunrise, sunset)"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("coalesce"));
}

#[test]
fn test_cli_list_workspace() {
    let temp_dir = workspace();

    zmanim()
        .arg("list")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Workspace contains 2 files, 5 zmanim, 2 event patterns",
        ))
        .stdout(predicate::str::contains("proportional_hours(3, gra)"))
        .stdout(predicate::str::contains("erev_shabbos"))
        .stdout(predicate::str::contains("Chanukah% → chanukah (priority 1)"));
}

#[test]
fn test_cli_classify_union_of_matches() {
    let temp_dir = workspace();

    zmanim()
        .args(["classify", "--date", "2024-12-27"])
        .args(["--event", "Chanukah: 3 Candles", "--event", "Erev Shabbat"])
        .arg("--dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout("chanukah\nerev_shabbos\n");
}

#[test]
fn test_cli_classify_without_matches() {
    let temp_dir = workspace();

    zmanim()
        .args(["classify", "--date", "2024-03-20", "--event", "Purim"])
        .arg("--dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout("no active events\n");
}
