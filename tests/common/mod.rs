#![allow(dead_code)]

use std::{fs, path::Path, process::Command, sync::Arc};

use provkit::{execution::Executor, logging::RunLog, utils::Redactor};

pub fn run_log(dir: &Path, redactor: Redactor) -> Arc<RunLog> {
    Arc::new(RunLog::create_with_stamp(dir, "test", redactor).unwrap())
}

pub fn executor(dir: &Path) -> Executor {
    executor_with(dir, Redactor::new())
}

pub fn executor_with(dir: &Path, redactor: Redactor) -> Executor {
    Executor::new(run_log(dir, redactor), 5).with_live_view(false)
}

pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
    let out = Command::new("git")
        .args(["-c", "user.email=dev@example.com", "-c", "user.name=dev"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("git {:?}: {}", args, e));
    assert!(out.status.success(), "git {:?} failed: {}", args, String::from_utf8_lossy(&out.stderr));
}

/// Fresh repository at `dir` with one committed README.
pub fn init_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("README.md"), "# widgets\n").unwrap();
    git(dir, &["init", "-q"]);
    git(dir, &["add", "README.md"]);
    git(dir, &["commit", "-q", "-m", "init"]);
}
