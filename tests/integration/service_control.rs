//! End-to-end coverage of the control verbs through the dummy service.

#[path = "common/mod.rs"]
mod common;

use std::path::Path;

use assert_cmd::Command;
use common::{
    DaemonGuard, process_alive, read_pid, wait_for_line, wait_for_path, wait_for_path_removed,
};
use tempfile::tempdir;

fn dummyd(dir: &Path, verb: &str) -> std::process::Output {
    Command::new(assert_cmd::cargo::cargo_bin!("dummyd"))
        .arg(verb)
        .arg("--dir")
        .arg(dir)
        .output()
        .expect("run dummyd")
}

#[test]
fn start_stop_lifecycle() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();
    let guard = DaemonGuard::new(dir);

    let output = dummyd(dir, "start");
    assert_eq!(output.status.code(), Some(0), "start should succeed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Starting dummyd service."), "stdout: {stdout}");
    assert!(stdout.contains("[ OK ]"), "stdout: {stdout}");

    wait_for_path(guard.pidfile());
    let pid = read_pid(guard.pidfile());
    assert!(process_alive(pid), "daemon should be running");
    wait_for_line(&dir.join("dummy.dat"), "beat");

    // A second start is a no-op that must leave the record untouched.
    let output = dummyd(dir, "start");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("[fail]"));
    assert_eq!(read_pid(guard.pidfile()), pid);

    let output = dummyd(dir, "stop");
    assert_eq!(output.status.code(), Some(0), "stop should succeed: {output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("[ OK ]"));
    wait_for_path_removed(guard.pidfile());
    wait_for_line(&dir.join("dummy.dat"), "terminated");
}

#[test]
fn stop_without_record_is_no_action() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();

    let output = dummyd(dir, "stop");
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stopping dummyd service."), "stdout: {stdout}");
    assert!(stdout.contains("[fail]"), "stdout: {stdout}");
}

#[test]
fn restart_replaces_the_running_instance() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();
    let guard = DaemonGuard::new(dir);

    let output = dummyd(dir, "start");
    assert_eq!(output.status.code(), Some(0), "start should succeed: {output:?}");
    wait_for_path(guard.pidfile());
    let first_pid = read_pid(guard.pidfile());

    let output = dummyd(dir, "restart");
    assert_eq!(output.status.code(), Some(0), "restart should succeed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stopping dummyd service."), "stdout: {stdout}");
    assert!(stdout.contains("Starting dummyd service."), "stdout: {stdout}");

    wait_for_path(guard.pidfile());
    let second_pid = read_pid(guard.pidfile());
    assert_ne!(first_pid, second_pid, "restart should produce a new process");
    assert!(process_alive(second_pid));

    let output = dummyd(dir, "stop");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn try_restart_when_stopped_is_no_action() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path();

    let output = dummyd(dir, "try-restart");
    assert_eq!(output.status.code(), Some(1));
    assert!(
        !dir.join("dummy.pid").exists(),
        "try-restart on a stopped service must not start it"
    );
}
