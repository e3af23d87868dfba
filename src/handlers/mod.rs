//! Subcommand entry points: wire config, logs and executor, then call the core.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;

use crate::{
    config::Config,
    error::Reported,
    execution::Executor,
    logging::{self, RunLog},
    utils::Redactor,
};

pub mod install;
pub mod provision;
pub mod push;

pub struct Context {
    pub cfg: Config,
    pub log_dir: Option<PathBuf>,
}

impl Context {
    /// Open this run's log files and an executor writing to them.
    pub fn start_run(&self, redactor: Redactor) -> Result<(Arc<RunLog>, Executor)> {
        let dir = self.log_dir.clone().unwrap_or_else(|| self.cfg.log_dir());
        let run_log = Arc::new(RunLog::create(&dir, redactor)?);
        if let Err(e) = logging::install(run_log.clone(), self.cfg.log_level()) {
            run_log.warn(format!("{:#}", e));
        }
        let exec = Executor::new(run_log.clone(), self.cfg.live_tail_lines());
        Ok((run_log, exec))
    }
}

/// Log a fatal error once, redacted, and hand `main` a marker so it is not printed again.
pub fn report(log: &RunLog, err: anyhow::Error) -> anyhow::Error {
    log.error(format!("{:#}", err));
    Reported.into()
}
