use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_config(dir: &Path, sessions: &str) -> PathBuf {
    let yaml = format!(
        r#"
feed:
  source_channel: 1
  path: "{feed}"
outbox:
  prediction_channel: 2
  path: "{outbox}"
state:
  path: "{state}"
engine:
  sessions: {sessions}
  utc_offset_hours: 0
"#,
        feed = dir.join("feed.jsonl").display(),
        outbox = dir.join("outbox.jsonl").display(),
        state = dir.join("state.json").display(),
    );
    let path = dir.join("suitcast.yaml");
    fs::write(&path, yaml).expect("write config");
    path
}

fn suitcast() -> Command {
    Command::cargo_bin("suitcast").expect("binary built")
}

#[test]
fn validate_only_reports_valid_config() {
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path(), "[{ start_hour: 0, end_hour: 24 }]");
    suitcast()
        .arg("--config")
        .arg(&config)
        .arg("--validate-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn invalid_session_window_fails() {
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path(), "[{ start_hour: 18, end_hour: 6 }]");
    suitcast()
        .arg("--config")
        .arg(&config)
        .arg("--validate-only")
        .assert()
        .failure()
        .stderr(predicate::str::contains("engine.sessions[0]"));
}

#[test]
fn run_then_status_reports_the_win() {
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path(), "[{ start_hour: 0, end_hour: 24 }]");
    fs::write(
        dir.path().join("feed.jsonl"),
        concat!(
            "{\"chat_id\": 1, \"text\": \"#N10. ✅ (10♦ 2♣)\", \"date\": \"2026-03-01T10:00:00Z\"}\n",
            "{\"chat_id\": 1, \"text\": \"#N12. ✅ (A♠)\", \"date\": \"2026-03-01T10:02:00Z\"}\n",
        ),
    )
    .expect("write feed");

    suitcast()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 announced, 1 edited"));

    suitcast()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("won 1 [+0:1 +1:0 +2:0] lost 0 pending 0"))
        .stdout(predicate::str::contains("outbox: 1 sent, 1 edits"));
}

#[test]
fn reset_clears_saved_predictions() {
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path(), "[{ start_hour: 0, end_hour: 24 }]");
    fs::write(
        dir.path().join("feed.jsonl"),
        "{\"chat_id\": 1, \"text\": \"#N10. ✅ (10♦)\"}\n",
    )
    .expect("write feed");

    suitcast().arg("--config").arg(&config).assert().success();
    suitcast()
        .arg("--config")
        .arg(&config)
        .arg("reset")
        .assert()
        .success();
    suitcast()
        .arg("--config")
        .arg(&config)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending_target\": null"));
}
