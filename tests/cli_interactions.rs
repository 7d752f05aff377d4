//! CLI options interaction tests
//!
//! These run the real binary. The probing runs only dial a closed loopback
//! port, so they finish quickly and never leave the machine.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const PROBE_VARS: &[&str] = &[
    "PROBE_TARGETS",
    "PROBE_FILTER",
    "PROBE_ROUNDS",
    "PROBE_INTERVAL_SECONDS",
    "DIAL_TIMEOUT_SECONDS",
    "ECHO_TIMEOUT_SECONDS",
    "PROBE_FORMAT",
    "ENABLE_COLOR",
    "CLIENT_CERT_PATH",
    "CLIENT_KEY_PATH",
    "LOG_FORMAT",
];

/// Helper function to create a test command isolated from the caller's environment
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("plp").unwrap();
    cmd.current_dir(dir.path());
    for var in PROBE_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper function to create a temporary directory holding a .env file
fn create_temp_env(content: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".env"), content).unwrap();
    temp_dir
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--rounds"))
        .stdout(predicate::str::contains("--dial-timeout"))
        .stdout(predicate::str::contains("--echo-timeout"));
}

#[test]
fn test_zero_rounds_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--rounds", "0", "--target", "node@127.0.0.1:1"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("rounds"));
}

#[test]
fn test_malformed_target_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--target", "missing-separator:28967"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_env_file_rounds_validated() {
    let dir = create_temp_env("PROBE_TARGETS=node@127.0.0.1:1\nPROBE_ROUNDS=0\n");
    create_test_cmd(&dir).assert().code(1);
}

#[test]
fn test_show_config_layers_env_and_cli() {
    let dir = create_temp_env("PROBE_TARGETS=abc@host1:28967,def@host2:28968\nPROBE_ROUNDS=7\n");
    create_test_cmd(&dir)
        .args(["--show-config", "--only", "def", "--dial-timeout", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rounds: 7"))
        .stdout(predicate::str::contains("Dial Timeout: 9s"))
        .stdout(predicate::str::contains("Selected Targets (1):"))
        .stdout(predicate::str::contains("def@host2:28968"));
}

#[test]
fn test_missing_credentials_exit_with_setup_code() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args([
            "--target", "node@127.0.0.1:1",
            "--cert", "absent-chain.pem",
            "--key", "absent-key.pem",
            "--interval", "0",
        ])
        .assert()
        .code(4)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("SETUP"));
}

#[test]
fn test_refused_dial_reports_every_round() {
    let dir = TempDir::new().unwrap();
    let output = create_test_cmd(&dir)
        .args([
            "--target", "node@127.0.0.1:1",
            "--rounds", "2",
            "--interval", "0",
            "--dial-timeout", "2",
            "--echo-timeout", "1",
            "--no-color",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4, "unexpected output: {}", stdout);
    assert_eq!(lines[0], "node : 127.0.0.1:1");
    assert_eq!(lines[1], "DialTime : PingTime");

    let round = regex::Regex::new(r"^FAILED\(refused, [0-9.]+(µs|ms|s)\) : \S+$").unwrap();
    for line in &lines[2..] {
        assert!(round.is_match(line), "unexpected round line: {}", line);
    }
}

#[test]
fn test_json_stream_has_one_event_per_line() {
    let dir = TempDir::new().unwrap();
    let output = create_test_cmd(&dir)
        .args([
            "--target", "node@127.0.0.1:1",
            "--rounds", "3",
            "--interval", "0",
            "--echo-timeout", "1",
            "--format", "json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events.len(), 4);
    assert_eq!(events[0]["event"], "target");
    for (i, event) in events[1..].iter().enumerate() {
        assert_eq!(event["event"], "sample");
        assert_eq!(event["round"], i as u64 + 1);
        assert_eq!(event["connect_ok"], false);
        assert_eq!(event["connect_failure"], "refused");
    }
}

#[test]
fn test_timestamped_lines() {
    let dir = TempDir::new().unwrap();
    let output = create_test_cmd(&dir)
        .args([
            "--target", "node@127.0.0.1:1",
            "--rounds", "1",
            "--interval", "0",
            "--echo-timeout", "1",
            "--timestamps",
            "--no-color",
        ])
        .output()
        .unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let prefix = regex::Regex::new(r"^\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2} ").unwrap();
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.lines().all(|line| prefix.is_match(line)), "unexpected output: {}", stdout);
}

#[test]
fn test_env_help_lists_variables() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--env-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Supported Environment Variables:"))
        .stdout(predicate::str::contains("PROBE_TARGETS"))
        .stdout(predicate::str::contains("LOG_FORMAT"));
}

#[test]
fn test_init_env_writes_example_once() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir).arg("--init-env").assert().success();

    let written = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert!(written.contains("# PROBE_TARGETS="));
    assert!(written.contains("# LOG_FORMAT=console"));

    // The example is all comments, so the defaults still load from it
    create_test_cmd(&dir)
        .arg("--show-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rounds: 100"));

    create_test_cmd(&dir)
        .arg("--init-env")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(dir.path().join(".env")).unwrap(), written);
}

#[test]
fn test_json_log_format_on_stderr() {
    let dir = create_temp_env("LOG_FORMAT=json\n");
    let output = create_test_cmd(&dir)
        .args([
            "--target", "node@127.0.0.1:1",
            "--rounds", "1",
            "--interval", "0",
            "--echo-timeout", "1",
            "--no-color",
            "--verbose",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    let entries: Vec<serde_json::Value> = stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(!entries.is_empty());
    assert!(entries.iter().all(|entry| entry["logger"] == "PROBE"));
    assert!(entries
        .iter()
        .any(|entry| entry["message"].as_str().is_some_and(|m| m.starts_with("Sampling 1 target(s)"))));
}
