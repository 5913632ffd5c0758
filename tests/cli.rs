//! End-to-end tests for the kiln binary

mod common;

use assert_cmd::Command;
use common::create_test_config;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const KILNFILE: &str = r#"
name: widget
config:
  greeting: hello
  exec:
    greet: echo <%= greeting %> > greeting.txt
    fail: exit 4
  clean:
    out: out
tasks:
  build:
    description: Greet and tidy up
    run: ['exec:greet', 'clean:out']
  broken: ['exec:greet', 'exec:fail', 'clean:out']
  default: [build]
"#;

fn kiln(config_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.current_dir(config_path.parent().unwrap())
        .env("NO_COLOR", "1")
        .env_remove("KILN_LOG")
        .arg("-f")
        .arg(config_path);
    cmd
}

#[test]
fn test_list_tasks() {
    let (_temp_dir, config_path) = create_test_config(KILNFILE);

    kiln(&config_path)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("Greet and tidy up"))
        .stdout(predicate::str::contains("exec:greet"))
        .stdout(predicate::str::contains("clean:out"));
}

#[test]
fn test_dry_run_prints_plan_only() {
    let (temp_dir, config_path) = create_test_config(KILNFILE);

    kiln(&config_path)
        .args(["--dry-run", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. exec:greet (exec)"))
        .stdout(predicate::str::contains("2. clean:out (clean)"));

    assert!(!temp_dir.path().join("greeting.txt").exists());
}

#[test]
fn test_default_task_runs() {
    let (temp_dir, config_path) = create_test_config(KILNFILE);
    fs::create_dir(temp_dir.path().join("out")).unwrap();

    kiln(&config_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Done, without errors."));

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("greeting.txt")).unwrap(),
        "hello\n"
    );
    assert!(!temp_dir.path().join("out").exists());
}

#[test]
fn test_single_target() {
    let (temp_dir, config_path) = create_test_config(KILNFILE);
    fs::create_dir(temp_dir.path().join("out")).unwrap();

    kiln(&config_path).arg("exec:greet").assert().success();

    assert!(temp_dir.path().join("greeting.txt").exists());
    assert!(temp_dir.path().join("out").exists());
}

#[test]
fn test_set_overrides_config_value() {
    let (temp_dir, config_path) = create_test_config(KILNFILE);

    kiln(&config_path)
        .args(["--set", "greeting=howdy", "exec:greet"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("greeting.txt")).unwrap(),
        "howdy\n"
    );
}

#[test]
fn test_unknown_task_fails() {
    let (_temp_dir, config_path) = create_test_config(KILNFILE);

    kiln(&config_path)
        .arg("missing")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Task 'missing' is not defined"));
}

#[test]
fn test_failing_action_reports_step() {
    let (temp_dir, config_path) = create_test_config(KILNFILE);
    fs::create_dir(temp_dir.path().join("out")).unwrap();

    kiln(&config_path)
        .args(["-q", "broken"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exec:fail"))
        .stderr(predicate::str::contains("step 2 of 3"));

    assert!(temp_dir.path().join("greeting.txt").exists());
    assert!(temp_dir.path().join("out").exists());
}

#[test]
fn test_arguments_after_task_are_rejected() {
    let (_temp_dir, config_path) = create_test_config(KILNFILE);

    kiln(&config_path)
        .args(["exec:greet", "--verbose"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unexpected arguments"));
}

#[test]
fn test_missing_config_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();

    Command::cargo_bin("kiln")
        .unwrap()
        .current_dir(temp_dir.path())
        .env("NO_COLOR", "1")
        .args(["-f", "nope.yml", "--list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_clean_with_relative_config_stays_in_project() {
    let outer = tempfile::TempDir::new().unwrap();
    let work = outer.path().join("work");
    fs::create_dir_all(work.join("dist")).unwrap();
    fs::write(outer.path().join("precious.txt"), "p").unwrap();
    fs::write(
        work.join("kiln.yml"),
        "config:\n  clean:\n    oops: ../precious.txt\n    dist: dist\n",
    )
    .unwrap();

    Command::cargo_bin("kiln")
        .unwrap()
        .current_dir(&work)
        .env("NO_COLOR", "1")
        .args(["-f", "kiln.yml", "clean:oops"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("clean:oops"));
    assert!(outer.path().join("precious.txt").exists());

    Command::cargo_bin("kiln")
        .unwrap()
        .current_dir(&work)
        .env("NO_COLOR", "1")
        .args(["-f", "kiln.yml", "clean:dist"])
        .assert()
        .success();
    assert!(!work.join("dist").exists());
}

#[test]
fn test_structural_error_runs_nothing() {
    let (temp_dir, config_path) = create_test_config(
        "config:\n  exec:\n    a: echo a > a.txt\ntasks:\n  build: ['exec:a', nope]\n",
    );

    kiln(&config_path)
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No actions were run."));
    assert!(!temp_dir.path().join("a.txt").exists());
}
