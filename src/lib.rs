//! provkit: idempotent host provisioning (Docker, a privileged service
//! account, Node.js tooling) plus an interactive GitHub repository installer.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod handlers;
pub mod installer;
pub mod logging;
pub mod printer;
pub mod provision;
pub mod runner;
pub mod utils;
pub mod verify;
