//! Commit and push the repository recorded in the env file, with an
//! operator-confirmed force push when the plain push is rejected.

use std::path::PathBuf;

use anyhow::Result;

use super::{github::authenticated_url, prompt::Prompter};
use crate::{
    config::envfile::{self, EnvFile},
    error::InstallError,
    execution::Executor,
    utils::shell_quote,
};

pub struct PushRequest<'a> {
    pub env: &'a EnvFile,
    pub github_host: &'a str,
    pub message: &'a str,
}

fn required<'e>(env: &'e EnvFile, key: &'static str) -> Result<&'e str, InstallError> {
    env.require(key).ok_or(InstallError::MissingRepoState(key))
}

pub async fn push(exec: &Executor, prompter: &mut impl Prompter, req: PushRequest<'_>) -> Result<()> {
    let token = req
        .env
        .require(envfile::GITHUB_TOKEN)
        .ok_or_else(|| InstallError::MissingToken(req.env.path().to_path_buf()))?;
    let org = required(req.env, envfile::GIT_REPO_ORG)?;
    let name = required(req.env, envfile::GIT_REPO_NAME)?;
    let path = PathBuf::from(required(req.env, envfile::GIT_REPO_PATH)?);

    let repo = exec.in_dir(&path);
    let log = exec.log();

    let branch = match req.env.require(envfile::GIT_REPO_BRANCH) {
        Some(b) => b.to_string(),
        None => {
            let head = repo.probe("git rev-parse --abbrev-ref HEAD", None).await?;
            head.first_line().unwrap_or("main").to_string()
        }
    };

    let staged = repo.run("git add -A", "stage changes").await?;
    if !staged.success() {
        log.warn("git add failed; pushing existing commits only");
    }
    let clean = repo.probe("git diff --cached --quiet", None).await?;
    if clean.success() {
        log.info("Nothing new to commit");
    } else {
        let commit = repo
            .run(&format!("git commit -m {}", shell_quote(req.message)), "commit changes")
            .await?;
        if !commit.success() {
            log.warn(format!("git commit failed (exit {})", commit.exit_code));
        }
    }

    let url = authenticated_url(&format!("https://{}/{}/{}.git", req.github_host, org, name), token);
    let refspec = format!("HEAD:{}", branch);
    log.info(format!("Pushing to {}/{} ({})", org, name, branch));
    let pushed = repo
        .run(&format!("git push {} {}", shell_quote(&url), shell_quote(&refspec)), "git push")
        .await?;
    if pushed.success() {
        log.success("Push complete");
        return Ok(());
    }

    log.warn("Push was rejected");
    if !prompter.confirm("Force push and overwrite the remote branch? [y/N]: ", false)? {
        return Err(InstallError::PushFailed(pushed.exit_code).into());
    }
    let forced = repo
        .run(&format!("git push --force {} {}", shell_quote(&url), shell_quote(&refspec)), "git push --force")
        .await?;
    if !forced.success() {
        return Err(InstallError::PushFailed(forced.exit_code).into());
    }
    log.success("Force push complete");
    Ok(())
}
