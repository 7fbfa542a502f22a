#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// Kills the process recorded in the PID file, if any, when a test ends, so
/// a failed assertion never leaks a detached dummy service.
pub struct DaemonGuard {
    pidfile: PathBuf,
}

impl DaemonGuard {
    pub fn new(dir: &Path) -> Self {
        Self {
            pidfile: dir.join("dummy.pid"),
        }
    }

    pub fn pidfile(&self) -> &Path {
        &self.pidfile
    }
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        if let Ok(contents) = fs::read_to_string(&self.pidfile)
            && let Ok(pid) = contents.trim().parse::<i32>()
        {
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
        }
    }
}

pub fn read_pid(path: &Path) -> i32 {
    fs::read_to_string(path)
        .expect("read pid file")
        .trim()
        .parse()
        .expect("parse pid file")
}

pub fn process_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}

pub fn wait_for_path_removed(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("Timed out waiting for {:?} to be removed", path);
}

pub fn wait_for_line(path: &Path, needle: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(content) = fs::read_to_string(path)
            && content.lines().any(|line| line.contains(needle))
        {
            return;
        }

        if Instant::now() >= deadline {
            panic!("Timed out waiting for '{needle}' in {:?}", path);
        }

        thread::sleep(Duration::from_millis(50));
    }
}
