//! `push` subcommand.

use std::path::PathBuf;

use anyhow::Result;

use super::{report, Context};
use crate::{
    config::{envfile, EnvFile},
    installer::{
        push::{self, PushRequest},
        StdinPrompter,
    },
    utils::Redactor,
};

pub async fn run(ctx: &Context, env_file: Option<PathBuf>, message: &str) -> Result<()> {
    let env_path = env_file.unwrap_or_else(|| ctx.cfg.env_file_path());
    let env = EnvFile::load(&env_path)?;
    let redactor = env
        .require(envfile::GITHUB_TOKEN)
        .map(|t| Redactor::new().with_secret(t.trim()))
        .unwrap_or_default();
    let (log, exec) = ctx.start_run(redactor)?;
    let github_host = ctx.cfg.get("GITHUB_HOST").unwrap_or_else(|| "github.com".into());

    let req = PushRequest { env: &env, github_host: &github_host, message };
    push::push(&exec, &mut StdinPrompter, req)
        .await
        .map_err(|e| report(&log, e))
}
