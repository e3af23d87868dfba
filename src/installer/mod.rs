//! Repository installer: pick a GitHub repository, clone it, install its
//! dependencies and optionally start its Docker Compose stack.
//!
//! The flow is a linear state machine. Every stage either advances or returns
//! a fatal [`InstallError`]; dependency and compose stages only warn.

use std::{fs, path::PathBuf};

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::{
    config::envfile::{self, EnvFile},
    error::InstallError,
    execution::Executor,
    utils::{expand_home, shell_quote},
};

pub mod github;
pub mod manifest;
pub mod prompt;
pub mod push;

pub use github::{GitHubClient, Organization, RepoHost, Repository};
pub use prompt::{Prompter, ScriptedPrompter, StdinPrompter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AuthCheck,
    OrgSelect,
    RepoList,
    RepoSelect,
    TargetDir,
    Clone,
    DependencyCheck,
    ComposeCheck,
    PersistState,
    Done,
}

impl Stage {
    fn next(self) -> Stage {
        match self {
            Stage::AuthCheck => Stage::OrgSelect,
            Stage::OrgSelect => Stage::RepoList,
            Stage::RepoList => Stage::RepoSelect,
            Stage::RepoSelect => Stage::TargetDir,
            Stage::TargetDir => Stage::Clone,
            Stage::Clone => Stage::DependencyCheck,
            Stage::DependencyCheck => Stage::ComposeCheck,
            Stage::ComposeCheck => Stage::PersistState,
            Stage::PersistState | Stage::Done => Stage::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSelection {
    /// Organization login, or the user's login for personal repositories.
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub clone_url: String,
    pub target: PathBuf,
    pub branch: Option<String>,
}

impl RepoSelection {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Default)]
pub struct InstallSession {
    pub login: Option<String>,
    /// `None` selects personal repositories.
    pub organization: Option<String>,
    pub repositories: Vec<Repository>,
    pub selection: Option<RepoSelection>,
}

pub struct Installer<'a, H, P> {
    host: H,
    prompter: P,
    exec: &'a Executor,
    env: EnvFile,
    default_base: PathBuf,
    github_host: String,
    token: String,
    session: InstallSession,
}

impl<'a, H: RepoHost, P: Prompter> Installer<'a, H, P> {
    pub fn new(host: H, prompter: P, exec: &'a Executor, env: EnvFile, default_base: PathBuf) -> Self {
        Self {
            host,
            prompter,
            exec,
            env,
            default_base,
            github_host: "github.com".into(),
            token: String::new(),
            session: InstallSession::default(),
        }
    }

    pub fn with_github_host(mut self, host: impl Into<String>) -> Self {
        self.github_host = host.into();
        self
    }

    pub fn session(&self) -> &InstallSession {
        &self.session
    }

    pub fn env(&self) -> &EnvFile {
        &self.env
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Drive the flow to completion, returning the cloned selection.
    pub async fn run(&mut self) -> Result<RepoSelection> {
        let mut stage = Stage::AuthCheck;
        while stage != Stage::Done {
            log::debug!("installer stage {:?}", stage);
            self.enter(stage).await?;
            stage = stage.next();
        }
        self.session
            .selection
            .clone()
            .ok_or_else(|| anyhow::anyhow!("installer finished without a selection"))
    }

    async fn enter(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::AuthCheck => self.auth_check().await,
            Stage::OrgSelect => self.org_select().await,
            Stage::RepoList => self.repo_list().await,
            Stage::RepoSelect => self.repo_select(),
            Stage::TargetDir => self.target_dir(),
            Stage::Clone => self.clone_repo().await,
            Stage::DependencyCheck => self.dependency_check().await,
            Stage::ComposeCheck => self.compose_check().await,
            Stage::PersistState => self.persist_state(),
            Stage::Done => Ok(()),
        }
    }

    async fn auth_check(&mut self) -> Result<()> {
        let token = self
            .env
            .require(envfile::GITHUB_TOKEN)
            .ok_or_else(|| InstallError::MissingToken(self.env.path().to_path_buf()))?;
        self.token = token.trim().to_string();

        let exec = self.exec;
        let log = exec.log();
        log.info("Checking GitHub authentication...");
        let user = self.host.current_user().await?;
        log.success(format!("Authenticated as {}", user.login));
        self.session.login = Some(user.login);
        Ok(())
    }

    async fn org_select(&mut self) -> Result<()> {
        let orgs = self.host.organizations().await?;
        let login = self.session.login.clone().unwrap_or_default();

        println!("\n{}", "Select a source:".bold());
        println!("  {}) Personal repositories ({})", "0".cyan(), login);
        for (i, org) in orgs.iter().enumerate() {
            println!("  {}) {}{}", (i + 1).cyan(), org.login, describe(&org.description));
        }
        let answer = self
            .prompter
            .ask(&format!("Select organization [0-{}]: ", orgs.len()))?;
        let idx = prompt::parse_selection(&answer, 0, orgs.len())?;

        self.session.organization = if idx == 0 { None } else { Some(orgs[idx - 1].login.clone()) };
        self.exec.log().info(format!(
            "Using {}",
            self.session.organization.as_deref().unwrap_or("personal repositories")
        ));
        Ok(())
    }

    async fn repo_list(&mut self) -> Result<()> {
        let org = self.session.organization.clone();
        let repos = self.host.repositories(org.as_deref()).await?;
        if repos.is_empty() {
            let whose = org
                .or_else(|| self.session.login.clone())
                .unwrap_or_else(|| "current user".into());
            return Err(InstallError::NoRepositories(whose).into());
        }
        self.session.repositories = repos;
        Ok(())
    }

    fn repo_select(&mut self) -> Result<()> {
        let repos = &self.session.repositories;
        println!("\n{}", "Repositories:".bold());
        for (i, repo) in repos.iter().enumerate() {
            let lock = if repo.private { " [private]" } else { "" };
            println!("  {}) {}{}{}", (i + 1).cyan(), repo.name, lock.dimmed(), describe(&repo.description));
        }
        let answer = self
            .prompter
            .ask(&format!("Select repository [1-{}]: ", repos.len()))?;
        let idx = prompt::parse_selection(&answer, 1, repos.len())?;
        let repo = &repos[idx - 1];

        let owner = repo.owner.login.clone();
        let clone_url = repo
            .clone_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/{}/{}.git", self.github_host, owner, repo.name));
        self.session.selection = Some(RepoSelection {
            owner,
            name: repo.name.clone(),
            description: repo.description.clone(),
            clone_url,
            target: PathBuf::new(),
            branch: repo.default_branch.clone(),
        });
        Ok(())
    }

    fn target_dir(&mut self) -> Result<()> {
        let answer = self.prompter.ask(&format!(
            "Clone into base directory [{}]: ",
            self.default_base.display()
        ))?;
        let base = if answer.is_empty() { self.default_base.clone() } else { expand_home(&answer) };
        fs::create_dir_all(&base)
            .map_err(|source| InstallError::DirectoryCreate { path: base.clone(), source })?;

        let selection = self.selection_mut()?;
        let target = base.join(&selection.name);
        selection.target = target.clone();

        if target.exists() {
            let overwrite = self.prompter.confirm(
                &format!("{} already exists. Overwrite? [y/N]: ", target.display()),
                false,
            )?;
            if !overwrite {
                return Err(InstallError::OverwriteDeclined(target).into());
            }
            let removed = if target.is_dir() { fs::remove_dir_all(&target) } else { fs::remove_file(&target) };
            removed.map_err(|source| InstallError::RemoveTarget { path: target.clone(), source })?;
            self.exec.log().warn(format!("Removed existing {}", target.display()));
        }
        Ok(())
    }

    async fn clone_repo(&mut self) -> Result<()> {
        let sel = self.selection_mut()?.clone();
        let url = github::authenticated_url(&sel.clone_url, &self.token);
        let target = sel.target.to_string_lossy().into_owned();

        let exec = self.exec;
        let log = exec.log();
        log.info(format!("Cloning {} into {}", sel.full_name(), target));
        let result = self
            .exec
            .run(&format!("git clone {} {}", shell_quote(&url), shell_quote(&target)), "git clone")
            .await?;
        if !result.success() {
            return Err(InstallError::CloneFailed { repo: sel.full_name(), code: result.exit_code }.into());
        }

        // Keep the token out of .git/config.
        let repo = self.exec.in_dir(&sel.target);
        let reset = repo
            .run(&format!("git remote set-url origin {}", shell_quote(&sel.clone_url)), "reset origin url")
            .await?;
        if !reset.success() {
            log.warn("Could not reset the origin URL; it may still contain credentials");
        }

        let head = repo.probe("git rev-parse --abbrev-ref HEAD", None).await?;
        if let Some(branch) = head.first_line().filter(|_| head.success()) {
            self.selection_mut()?.branch = Some(branch.to_string());
        }
        log.success(format!("Cloned {}", sel.full_name()));
        Ok(())
    }

    async fn dependency_check(&mut self) -> Result<()> {
        let target = self.selection_mut()?.target.clone();
        let exec = self.exec;
        let log = exec.log();
        let found = manifest::detect_manifests(&target);
        if found.is_empty() {
            log.info("No dependency manifests found");
            return Ok(());
        }
        for m in &found {
            log.info(format!("Found {} ({}) -> {}", m.file, m.ecosystem, m.install));
        }
        if !self.prompter.confirm("Install dependencies? [y/N]: ", false)? {
            log.info("Skipping dependency installation");
            return Ok(());
        }
        let repo = self.exec.in_dir(&target);
        for m in &found {
            let r = repo.run(&m.install, &format!("{} dependencies", m.ecosystem)).await?;
            if r.success() {
                log.success(format!("{} dependencies installed", m.ecosystem));
            } else {
                log.warn(format!("{} dependency install failed (exit {}), continuing", m.ecosystem, r.exit_code));
            }
        }
        Ok(())
    }

    async fn compose_check(&mut self) -> Result<()> {
        let target = self.selection_mut()?.target.clone();
        let exec = self.exec;
        let log = exec.log();
        let Some(file) = manifest::detect_compose(&target) else {
            log.info("No Docker Compose file found");
            return Ok(());
        };
        let file_name = file
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self
            .prompter
            .confirm(&format!("Start the stack in {}? [y/N]: ", file_name), false)?
        {
            return Ok(());
        }

        let compose = if self.exec.probe("docker compose version", None).await?.success() {
            "docker compose"
        } else if self.exec.probe("command -v docker-compose", None).await?.success() {
            "docker-compose"
        } else {
            log.warn("Docker Compose is not installed; skipping");
            return Ok(());
        };

        let r = self
            .exec
            .in_dir(&target)
            .run(&format!("{} -f {} up -d", compose, shell_quote(&file_name)), "docker compose up")
            .await?;
        if r.success() {
            log.success("Compose stack started");
        } else {
            log.warn(format!("Compose stack failed to start (exit {})", r.exit_code));
        }
        Ok(())
    }

    fn persist_state(&mut self) -> Result<()> {
        let sel = self.selection_mut()?.clone();
        let path = fs::canonicalize(&sel.target).unwrap_or(sel.target.clone());
        self.env.update(&[
            (envfile::GIT_REPO_ORG, sel.owner.clone()),
            (envfile::GIT_REPO_NAME, sel.name.clone()),
            (envfile::GIT_REPO_BRANCH, sel.branch.clone().unwrap_or_default()),
            (envfile::GIT_REPO_PATH, path.to_string_lossy().into_owned()),
        ])?;
        self.exec
            .log()
            .success(format!("Saved repository details to {}", self.env.path().display()));
        Ok(())
    }

    fn selection_mut(&mut self) -> Result<&mut RepoSelection> {
        self.session
            .selection
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no repository selected"))
    }
}

fn describe(description: &Option<String>) -> String {
    match description.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => format!(" - {}", d),
        _ => String::new(),
    }
}
