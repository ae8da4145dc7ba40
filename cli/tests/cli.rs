//! End-to-end tests driving the `taskcurve` binary as a subprocess against a
//! throwaway data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("taskcurve").unwrap();
    cmd.arg("--data-dir").arg(dir.path());
    cmd
}

#[test]
fn init_creates_store() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("initialized store"));
    assert!(dir.path().exists());
}

#[test]
fn task_create_list_and_show() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();

    cmd(&dir)
        .args(["task", "create", "Write report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));

    cmd(&dir)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write report"));

    cmd(&dir)
        .args(["task", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write report"))
        .stdout(predicate::str::contains("curve:"));
}

#[test]
fn task_complete_then_reopen_round_trips_status() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();
    cmd(&dir)
        .args(["task", "create", "One-off errand"])
        .assert()
        .success();

    cmd(&dir)
        .args(["task", "complete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    cmd(&dir)
        .args(["task", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"));

    cmd(&dir)
        .args(["task", "reopen", "1"])
        .assert()
        .success();

    cmd(&dir)
        .args(["task", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Open"));
}

#[test]
fn task_delete_rejects_when_a_dependent_exists() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();

    cmd(&dir)
        .args(["task", "create", "Foundation"])
        .assert()
        .success();
    cmd(&dir)
        .args(["task", "create", "Depends on foundation", "--depends-on", "1"])
        .assert()
        .success();

    cmd(&dir)
        .args(["task", "delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));

    cmd(&dir)
        .args(["task", "delete", "1", "--force"])
        .assert()
        .success();
}

#[test]
fn dependency_cycle_is_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();

    cmd(&dir).args(["task", "create", "A"]).assert().success();
    cmd(&dir)
        .args(["task", "create", "B", "--depends-on", "1"])
        .assert()
        .success();

    // Closing the loop: task 1 cannot depend on task 2, which already
    // depends on task 1.
    cmd(&dir)
        .args(["task", "update", "1", "--depends-on", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular dependency"));
}

#[test]
fn bucket_create_and_task_assignment_by_name() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();

    cmd(&dir)
        .args(["bucket", "create", "Personal", "--kind", "context"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));

    cmd(&dir)
        .args(["task", "create", "Buy groceries", "--bucket-name", "personal"])
        .assert()
        .success();

    cmd(&dir)
        .args(["task", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Personal"));
}

#[test]
fn bucket_name_with_no_match_warns_but_still_creates_task() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();

    cmd(&dir)
        .args(["task", "create", "Mystery task", "--bucket-name", "nonexistent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no bucket"));
}

#[test]
fn priority_ranking_lists_open_tasks() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();
    cmd(&dir)
        .args(["task", "create", "Urgent thing", "--deadline", "2026-07-27T00:00:00Z"])
        .assert()
        .success();

    cmd(&dir)
        .args(["priority"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Urgent thing"));
}

#[test]
fn plan_packs_tasks_into_work_hours() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();
    cmd(&dir)
        .args([
            "task",
            "create",
            "Focused work block",
            "--deadline",
            "2026-07-27T00:00:00Z",
            "--estimate",
            "60",
        ])
        .assert()
        .success();

    cmd(&dir)
        .args(["plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Focused work block"));
}

#[test]
fn export_then_import_round_trips_tasks() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();
    cmd(&dir)
        .args(["task", "create", "Keep me"])
        .assert()
        .success();

    let export_path = dir.path().join("snapshot.json");
    cmd(&dir)
        .args(["export", "--output"])
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported"));
    assert!(export_path.exists());

    let other_dir = TempDir::new().unwrap();
    cmd(&other_dir).arg("init").assert().success();
    cmd(&other_dir)
        .args(["import"])
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported"));

    cmd(&other_dir)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Keep me"));
}

#[test]
fn search_finds_tasks_by_title_substring() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("init").assert().success();
    cmd(&dir)
        .args(["task", "create", "Renew passport"])
        .assert()
        .success();
    cmd(&dir)
        .args(["task", "create", "Buy milk"])
        .assert()
        .success();

    cmd(&dir)
        .args(["task", "search", "passport"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renew passport"))
        .stdout(predicate::str::contains("Buy milk").not());
}
