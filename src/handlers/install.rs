//! `install-repo` subcommand.

use std::path::PathBuf;

use anyhow::Result;

use super::{report, Context};
use crate::{
    config::{envfile, EnvFile},
    installer::{GitHubClient, Installer, StdinPrompter},
    printer::banner,
    utils::{expand_home, Redactor},
};

pub async fn run(ctx: &Context, env_file: Option<PathBuf>) -> Result<()> {
    let env_path = env_file.unwrap_or_else(|| ctx.cfg.env_file_path());
    let env = EnvFile::load(&env_path)?;
    let token = env.require(envfile::GITHUB_TOKEN).map(str::to_string);

    let redactor = token
        .as_deref()
        .map(|t| Redactor::new().with_secret(t.trim()))
        .unwrap_or_default();
    let (log, exec) = ctx.start_run(redactor)?;
    banner("Repository installer", &format!("env file {}", env_path.display()));
    log.info(format!("Logging to {}", log.setup_path().display()));

    let host = GitHubClient::from_config(&ctx.cfg, token.as_deref())?;
    let default_base = match ctx.cfg.get("REPO_BASE_DIR") {
        Some(dir) => expand_home(&dir),
        None => std::env::current_dir()?,
    };
    let github_host = ctx.cfg.get("GITHUB_HOST").unwrap_or_else(|| "github.com".into());

    let mut installer = Installer::new(host, StdinPrompter, &exec, env, default_base).with_github_host(github_host);
    match installer.run().await {
        Ok(sel) => {
            log.success(format!("{} is ready at {}", sel.full_name(), sel.target.display()));
            Ok(())
        }
        Err(e) => Err(report(&log, e)),
    }
}
