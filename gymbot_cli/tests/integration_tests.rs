//! Integration tests for the gymbot binary.
//!
//! These tests drive whole conversations through `send`, one process per
//! invocation, which also exercises session durability across restarts.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("gymbot"))
}

/// One `send` invocation with a fresh process
fn send(data_dir: &Path, inputs: &[&str]) -> String {
    let mut cmd = cli();
    cmd.arg("send")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--user")
        .arg("1")
        .arg("--username")
        .arg("tester");
    for input in inputs {
        cmd.arg(input);
    }
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8_lossy(&output).into_owned()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Gym training plan and workout chat bot",
        ));
}

#[test]
fn test_start_greets_user() {
    let temp_dir = setup_test_dir();
    let out = send(temp_dir.path(), &["/start"]);
    assert!(out.contains("Hello, tester! Ready to train?"));
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = setup_test_dir();
    let out = send(temp_dir.path(), &["/help"]);
    assert!(out.contains("/createplan"));
    assert!(out.contains("/startworkout"));
}

#[test]
fn test_text_without_flow_hints_help() {
    let temp_dir = setup_test_dir();
    let out = send(temp_dir.path(), &["bench 100kg"]);
    assert!(out.contains("/help"));
}

#[test]
fn test_plan_creation_survives_process_restarts() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    send(data_dir, &["/start"]);

    // Every step is its own process; the session store carries the draft
    for step in [
        "/createplan",
        "Split",
        "2",
        "Training",
        "Back",
        "Done",
        "Pull-up",
        "Done",
        "-",
    ] {
        send(data_dir, &[step]);
    }

    // Mid-flow the draft is on disk
    assert!(data_dir.join("sessions/1.json").exists());

    send(data_dir, &[">day_keep"]);
    send(data_dir, &["Rest day"]);
    let out = send(data_dir, &[">day_keep"]);
    assert!(out.contains("Plan saved"));
    assert!(out.contains("Day 1: Training - Back"));
    assert!(out.contains("Day 2: Rest"));

    // Finalize cleared the session
    assert!(!data_dir.join("sessions/1.json").exists());

    let out = send(data_dir, &["/myplans"]);
    assert!(out.contains("Split (2 days)"));
}

#[test]
fn test_custom_workout_end_to_end() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    send(data_dir, &["/start"]);
    let out = send(
        data_dir,
        &["/startworkout", "Custom workout", "Chest", "Done"],
    );

    // Pull the Bench Press callback out of the printed picker
    let pick = out
        .lines()
        .find(|l| l.contains("(Bench Press)"))
        .and_then(|l| l.split('>').nth(1))
        .expect("picker should offer Bench Press")
        .trim()
        .to_string();

    let out = send(
        data_dir,
        &[&format!(">{}", pick), "60", "8", ">finish"],
    );
    assert!(out.contains("60 kg x 8"));
    assert!(out.contains("(custom)"));

    let out = send(data_dir, &["/history"]);
    assert!(out.contains("Chest (custom)"));
}

#[test]
fn test_invalid_inputs_reprompt() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    send(data_dir, &["/start", "/createplan", "Split"]);

    let out = send(data_dir, &["soon"]);
    assert!(out.contains("positive number"));

    // The step survives the bad input
    let out = send(data_dir, &["3"]);
    assert!(out.contains("Day 1"));
}

#[test]
fn test_plan_management_buttons() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    send(data_dir, &["/start"]);
    send(
        data_dir,
        &["/createplan", "Deload", "1", "Rest day", ">day_keep"],
    );

    let out = send(data_dir, &["/myplans"]);
    let use_action = out
        .lines()
        .find(|l| l.contains("(Make current)"))
        .and_then(|l| l.split('>').nth(1))
        .expect("plan list should offer Make current")
        .trim()
        .to_string();

    let out = send(data_dir, &[&format!(">{}", use_action)]);
    assert!(out.contains("current plan"));
    let out = send(data_dir, &["/myplans"]);
    assert!(out.contains("(current)"));

    // A plan of rest days has nothing to train
    let out = send(data_dir, &["/startworkout", "From my plan"]);
    assert!(out.contains("no training days"));
}

#[test]
fn test_stale_callback_is_answered() {
    let temp_dir = setup_test_dir();
    let out = send(temp_dir.path(), &["/start", ">plan_del:9999"]);
    assert!(out.contains("no longer exists"));
}
