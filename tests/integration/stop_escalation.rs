//! `stop` must escalate to SIGKILL when the recorded process ignores the
//! termination signal, succeed, and say so.

#[path = "common/mod.rs"]
mod common;

use std::{fs, process::Command as StdCommand};

use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn stubborn_process_is_killed_with_warning() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();

    // A foreign process that shrugs off SIGTERM, standing in for a wedged
    // service instance.
    let mut child = StdCommand::new("sh")
        .args(["-c", "trap '' TERM; while true; do sleep 1; done"])
        .spawn()
        .expect("spawn stubborn shell");
    fs::write(dir.join("dummy.pid"), child.id().to_string()).expect("write pid file");

    let output = Command::new(assert_cmd::cargo::cargo_bin!("dummyd"))
        .arg("stop")
        .arg("--dir")
        .arg(dir)
        .output()
        .expect("run dummyd");

    assert_eq!(output.status.code(), Some(0), "stop should succeed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[ OK ]"), "stdout: {stdout}");
    assert!(stdout.contains("SIGKILL"), "stdout: {stdout}");
    assert!(
        !dir.join("dummy.pid").exists(),
        "record should be cleared after a forced stop"
    );

    let _ = child.wait();
}
