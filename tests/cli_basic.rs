//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, and the offline
//! subcommands work against the fixture transcript.

#![allow(deprecated)] // cargo_bin deprecation — replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/transcript.json");

const EMPTY_CONFIG: &str = concat!(env!("CARGO_TARGET_TMPDIR"), "/wordcap-empty.toml");

/// Helper: get a Command for the `wordcap` binary with an empty config file,
/// so a user's `~/.config/wordcap/config.toml` never leaks in.
fn wordcap() -> Command {
    std::fs::write(EMPTY_CONFIG, "").expect("empty config should be writable");
    let mut cmd = Command::cargo_bin("wordcap").expect("binary 'wordcap' should be built");
    cmd.args(["--config", EMPTY_CONFIG]);
    cmd.env_remove("RUST_LOG");
    cmd
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    wordcap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: wordcap"))
        .stdout(predicate::str::contains("segment"))
        .stdout(predicate::str::contains("timeline"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("styles"));
}

#[test]
fn version_flag_shows_semver() {
    wordcap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^wordcap \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn unknown_subcommand_fails() {
    wordcap()
        .arg("nonexistent-subcommand")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn render_help_lists_strategy() {
    wordcap()
        .args(["render", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--strategy"))
        .stdout(predicate::str::contains("--transcript"))
        .stdout(predicate::str::contains("--max-gap"));
}

// ─── styles ──────────────────────────────────────────────────────────────────

#[test]
fn styles_lists_builtin_presets() {
    wordcap()
        .arg("styles")
        .assert()
        .success()
        .stdout(predicate::str::contains("punchy"))
        .stdout(predicate::str::contains("subtitle"))
        .stdout(predicate::str::contains("karaoke"))
        .stdout(predicate::str::contains("per_word"));
}

#[test]
fn styles_json_is_parseable() {
    let output = wordcap().args(["styles", "--json"]).output().unwrap();
    assert!(output.status.success());
    let presets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(presets["karaoke"]["segmentation_method"], "per_word");
    assert_eq!(presets["subtitle"]["max_lines"], 2);
}

// ─── segment ─────────────────────────────────────────────────────────────────

#[test]
fn segment_fixture_default_limits() {
    wordcap()
        .args(["segment", FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("It's a well-known"))
        .stdout(predicate::str::contains("Anyway, let's go."))
        .stderr(predicate::str::contains("4 segments"));
}

#[test]
fn segment_json_respects_overrides() {
    let output = wordcap()
        .args(["segment", FIXTURE, "--json", "--max-words", "0", "--max-duration", "0"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let segments: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let segments = segments.as_array().unwrap();
    // Only the one-second silence cuts
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1]["start"], 4.6);
    assert_eq!(segments[1]["text"], "Anyway, let's go.");
}

#[test]
fn segment_reads_limits_from_config_file() {
    let path = concat!(env!("CARGO_TARGET_TMPDIR"), "/wordcap-gap-only.toml");
    std::fs::write(path, "[segmentation]\nmax_words = 0\nmax_duration = 0.0\n").unwrap();

    Command::cargo_bin("wordcap")
        .unwrap()
        .args(["--config", path, "segment", FIXTURE])
        .assert()
        .success()
        .stderr(predicate::str::contains("2 segments"));
}

#[test]
fn segment_rejects_bad_gap() {
    wordcap()
        .args(["segment", FIXTURE, "--max-gap", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_gap"));
}

#[test]
fn segment_missing_file_fails() {
    wordcap()
        .args(["segment", "/nonexistent/transcript.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// ─── timeline ────────────────────────────────────────────────────────────────

#[test]
fn timeline_per_word_emits_every_word() {
    let output = wordcap()
        .args(["timeline", FIXTURE, "--style", "karaoke"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let timeline: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(timeline["method"], "per_word");
    assert_eq!(timeline["frame"]["width"], 1080);
    assert_eq!(timeline["elements"].as_array().unwrap().len(), 19);
}

#[test]
fn timeline_unknown_style_fails() {
    wordcap()
        .args(["timeline", FIXTURE, "--style", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown style"));
}
