//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_habitroll"))
        .env("HABITROLL_HOME", home)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(home: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("bad JSON from {args:?}: {e}\n{stdout}"))
}

#[test]
fn test_catalog_setup() {
    let home = tempfile::tempdir().unwrap();
    let user = run_json(home.path(), &["user", "add", "ana", "--weight", "2"]);
    assert_eq!(user["name"], "ana");
    assert_eq!(user["weight"].as_f64(), Some(2.0));

    let habit = run_json(home.path(), &["habit", "add", "run", "--category", "fitness"]);
    assert_eq!(habit["category"], "fitness");

    let reward = run_json(
        home.path(),
        &["reward", "add", "Book", "--pieces", "3", "--daily-cap", "1", "--value", "5"],
    );
    assert_eq!(reward["pieces_required"], 3);
    assert_eq!(reward["max_daily_claims"], 1);

    let nothing = run_json(
        home.path(),
        &["reward", "add", "Nothing", "--nothing", "--weight", "4"],
    );
    assert_eq!(nothing["is_nothing"], true);

    let rewards = run_json(home.path(), &["reward", "list"]);
    assert_eq!(rewards.as_array().map(Vec::len), Some(2));
}

#[test]
fn test_nothing_reward_rejects_piece_options() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["reward", "add", "Nothing", "--nothing", "--pieces", "3"],
    );
    assert_eq!(code, 2, "{stderr}");
    assert!(stderr.contains("cannot be used with"), "{stderr}");

    let (_, _, code) = run_cli(
        home.path(),
        &["reward", "add", "Nothing", "--nothing", "--daily-cap", "1"],
    );
    assert_eq!(code, 2);

    let rewards = run_json(home.path(), &["reward", "list", "--all"]);
    assert_eq!(rewards.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_complete_claim_cycle() {
    let home = tempfile::tempdir().unwrap();
    run_json(home.path(), &["user", "add", "ana"]);
    run_json(home.path(), &["habit", "add", "run"]);
    run_json(home.path(), &["reward", "add", "Star"]);

    let first = run_json(
        home.path(),
        &["complete", "1", "1", "--at", "2026-01-01T09:00:00Z"],
    );
    assert_eq!(first["streak"], 1);
    assert_eq!(first["reward"]["name"], "Star");
    assert_eq!(first["progress"]["status"], "ACHIEVED");
    let total = first["total_weight"].as_f64().unwrap();
    assert!((total - 1.1).abs() < 1e-9, "{total}");

    // Star is awaiting its claim, so nothing is eligible.
    let second = run_json(
        home.path(),
        &["complete", "1", "1", "--at", "2026-01-01T18:00:00Z"],
    );
    assert_eq!(second["streak"], 1);
    assert!(second["reward"].is_null());

    let claimed = run_json(home.path(), &["claim", "1", "1"]);
    assert_eq!(claimed["status"], "CLAIMED");
    assert_eq!(claimed["pieces_earned"], 0);

    let streaks = run_json(home.path(), &["streaks", "1"]);
    assert_eq!(streaks[0]["streak"], 1);

    let history = run_json(home.path(), &["history", "1", "--limit", "10"]);
    assert_eq!(history.as_array().map(Vec::len), Some(2));
    assert_eq!(history[0]["reward_granted"], false);
    assert_eq!(history[1]["reward_granted"], true);
}

#[test]
fn test_claim_before_achieved_fails() {
    let home = tempfile::tempdir().unwrap();
    run_json(home.path(), &["user", "add", "ana"]);
    run_json(home.path(), &["reward", "add", "Book", "--pieces", "5"]);

    let (_, stderr, code) = run_cli(home.path(), &["claim", "1", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(stderr.contains("PENDING"), "{stderr}");
}

#[test]
fn test_complete_unknown_user_fails() {
    let home = tempfile::tempdir().unwrap();
    run_json(home.path(), &["habit", "add", "run"]);

    let (_, stderr, code) = run_cli(home.path(), &["complete", "99", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("user 99 not found"), "{stderr}");
}

#[test]
fn test_revert_restores_history() {
    let home = tempfile::tempdir().unwrap();
    run_json(home.path(), &["user", "add", "ana"]);
    run_json(home.path(), &["habit", "add", "run"]);
    let done = run_json(home.path(), &["complete", "1", "1"]);
    let id = done["completion_id"].as_i64().unwrap().to_string();

    let reverted = run_json(home.path(), &["revert", &id]);
    assert_eq!(reverted["habit_id"], 1);
    let history = run_json(home.path(), &["history", "1"]);
    assert_eq!(history.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "engine.streak_rate"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "0.1");

    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "engine.streak_rate", "0.5"]);
    assert_eq!(code, 0, "{stderr}");
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "engine.streak_rate"]);
    assert_eq!(stdout.trim(), "0.5");

    let (_, stderr, code) =
        run_cli(home.path(), &["config", "set", "storage.database", "/tmp/habitroll-alt.db"]);
    assert_eq!(code, 0, "{stderr}");
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "storage.database"]);
    assert_eq!(stdout.trim(), "/tmp/habitroll-alt.db");
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "storage.database", "none"]);
    assert_eq!(code, 0, "{stderr}");

    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "engine.bogus", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let shown = run_json(home.path(), &["config", "show"]);
    assert_eq!(shown["engine"]["streak_rate"].as_f64(), Some(0.5));
}
