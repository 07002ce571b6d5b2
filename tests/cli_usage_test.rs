//! Tests of the `wf` binary's command line and exit statuses.

use std::fs;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn wf() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wf"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_no_arguments_exits_with_minus_one() {
    let output = wf().output().expect("Failed to run wf");
    assert_eq!(output.status.code(), Some(255));
}

#[test]
fn test_missing_separator_is_usage_error() {
    let output = wf().arg("a.txt").output().expect("Failed to run wf");
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing `--`"));
    assert!(stderr.contains("Usage:"));
}

#[test]
fn test_empty_command_is_usage_error() {
    let output = wf().args(["a.txt", "--"]).output().expect("Failed to run wf");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_help_lists_substitutions() {
    let output = wf().arg("--help").output().expect("Failed to run wf");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("%F"));
    assert!(stdout.contains("--shell"));
    assert!(stdout.contains("./-name"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("settings.toml");
    fs::write(&config, "[exec]\nmode = \"teleport\"\n").unwrap();

    let output = wf()
        .arg("--config")
        .arg(&config)
        .args(["a.txt", "--", "true"])
        .output()
        .expect("Failed to run wf");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load configuration"));
}

#[test]
fn test_missing_config_file_is_reported_once() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("absent.toml");

    let output = wf()
        .arg("--config")
        .arg(&config)
        .args(["a.txt", "--", "true"])
        .output()
        .expect("Failed to run wf");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("wf: Failed to load configuration: "));
    assert_eq!(stderr.matches("not found").count(), 1);
}

#[test]
fn test_runs_command_on_modification() {
    let temp_dir = TempDir::new().unwrap();
    let watched = temp_dir.path().join("input.txt");
    let marker = temp_dir.path().join("input.txt.seen");
    fs::write(&watched, "0").unwrap();

    let mut child = wf()
        .current_dir(temp_dir.path())
        .arg(&watched)
        .args(["--", "touch", "%F.seen"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start wf");

    // Keep modifying until the watcher has registered and reacted.
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut n = 0;
    while !marker.exists() && Instant::now() < deadline {
        n += 1;
        fs::write(&watched, n.to_string()).unwrap();
        std::thread::sleep(Duration::from_millis(50));
    }

    child.kill().ok();
    child.wait().ok();
    assert!(marker.exists(), "wf never ran the command");
}
