//! Fatal error kinds. Anything here ends the run with exit code 1.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("provisioning must run as root (effective uid {0})")]
    NotRoot(u32),
    #[error("could not determine the effective uid")]
    UnknownUid,
    #[error("unsupported distribution: {0}")]
    UnsupportedDistro(String),
    #[error("critical step '{step}' failed with exit code {code}")]
    CriticalStep { step: String, code: i32 },
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("GITHUB_TOKEN is not set in {}", .0.display())]
    MissingToken(PathBuf),
    #[error("GitHub API error: {message}")]
    Api { message: String },
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid selection '{input}': expected a number from {min} to {max}")]
    InvalidSelection { input: String, min: usize, max: usize },
    #[error("no repositories found for {0}")]
    NoRepositories(String),
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreate { path: PathBuf, source: io::Error },
    #[error("{} already exists and overwrite was declined", .0.display())]
    OverwriteDeclined(PathBuf),
    #[error("failed to remove {}: {source}", .path.display())]
    RemoveTarget { path: PathBuf, source: io::Error },
    #[error("git clone of {repo} failed with exit code {code}")]
    CloneFailed { repo: String, code: i32 },
    #[error("{0} is not set in the env file; run install-repo first")]
    MissingRepoState(&'static str),
    #[error("git push failed with exit code {0}")]
    PushFailed(i32),
}

/// A fatal error that has already been written to the console and run logs.
#[derive(Debug, Error)]
#[error("run failed; details are in the error log")]
pub struct Reported;
