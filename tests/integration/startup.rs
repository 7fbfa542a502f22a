//! Startup-synchronisation failure modes: reported failure, and a workload
//! that never reports at all.

#[path = "common/mod.rs"]
mod common;

use std::path::Path;

use assert_cmd::Command;
use common::{DaemonGuard, wait_for_path_removed};
use tempfile::tempdir;

fn dummyd(dir: &Path, extra: &[&str], verb: &str) -> std::process::Output {
    Command::new(assert_cmd::cargo::cargo_bin!("dummyd"))
        .arg(verb)
        .arg("--dir")
        .arg(dir)
        .args(extra)
        .output()
        .expect("run dummyd")
}

#[test]
fn reported_failure_fails_the_start() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();
    let _guard = DaemonGuard::new(dir);

    let output = dummyd(dir, &["--fail"], "start");
    assert_eq!(output.status.code(), Some(2), "start should fail: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[fail]"), "stdout: {stdout}");

    // The failed daemon exits right after reporting and clears its record.
    wait_for_path_removed(&dir.join("dummy.pid"));
}

#[test]
fn silent_startup_times_out() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();
    let _guard = DaemonGuard::new(dir);

    let output = dummyd(dir, &["--hang", "--startup-timeout", "1"], "start");
    assert_eq!(output.status.code(), Some(2), "start should fail: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[fail]"), "stdout: {stdout}");
    assert!(
        stdout.contains("Timed out waiting for the startup report"),
        "stdout: {stdout}"
    );
}
