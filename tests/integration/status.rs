//! The `status` verb: LSB status codes derived from the PID record.

#[path = "common/mod.rs"]
mod common;

use std::{fs, path::Path};

use assert_cmd::Command;
use common::{DaemonGuard, wait_for_path};
use predicates::str::contains;
use tempfile::tempdir;

fn dummyd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dummyd"));
    cmd.arg("status").arg("--dir").arg(dir);
    cmd
}

#[test]
fn missing_record_reports_stopped() {
    let temp = tempdir().expect("tempdir");

    dummyd(temp.path())
        .assert()
        .code(3)
        .stdout(contains("service is stopped"));
}

#[test]
fn corrupt_record_reports_dead_with_pidfile_and_reaps_it() {
    let temp = tempdir().expect("tempdir");
    let pidfile = temp.path().join("dummy.pid");
    fs::write(&pidfile, "not-a-number").expect("write pid file");

    dummyd(temp.path())
        .assert()
        .code(1)
        .stdout(contains("Invalid PID"));

    assert!(!pidfile.exists(), "corrupt record should be deleted");
}

#[test]
fn running_service_reports_running() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();
    let guard = DaemonGuard::new(dir);

    let output = Command::new(assert_cmd::cargo::cargo_bin!("dummyd"))
        .arg("start")
        .arg("--dir")
        .arg(dir)
        .output()
        .expect("run dummyd start");
    assert_eq!(output.status.code(), Some(0), "start should succeed: {output:?}");
    wait_for_path(guard.pidfile());

    dummyd(dir)
        .assert()
        .code(0)
        .stdout(contains("service is running"));

    let output = Command::new(assert_cmd::cargo::cargo_bin!("dummyd"))
        .arg("stop")
        .arg("--dir")
        .arg(dir)
        .output()
        .expect("run dummyd stop");
    assert_eq!(output.status.code(), Some(0));
}
