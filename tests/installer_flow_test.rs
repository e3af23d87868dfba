mod common;

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use provkit::{
    config::{envfile, EnvFile},
    error::InstallError,
    installer::{
        github::{GitHubUser, Owner},
        Installer, Organization, RepoHost, Repository, ScriptedPrompter,
    },
};

#[derive(Clone, Default)]
struct FakeHost {
    calls: Arc<Mutex<Vec<String>>>,
    orgs: Vec<Organization>,
    orgs_error: Option<String>,
    repos: Vec<Repository>,
}

impl FakeHost {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl RepoHost for FakeHost {
    async fn current_user(&self) -> Result<GitHubUser, InstallError> {
        self.record("GET /user");
        Ok(GitHubUser { login: "octocat".into() })
    }

    async fn organizations(&self) -> Result<Vec<Organization>, InstallError> {
        self.record("GET /user/orgs");
        match &self.orgs_error {
            Some(message) => Err(InstallError::Api { message: message.clone() }),
            None => Ok(self.orgs.clone()),
        }
    }

    async fn repositories(&self, org: Option<&str>) -> Result<Vec<Repository>, InstallError> {
        match org {
            None => self.record("GET /user/repos"),
            Some(o) => self.record(format!("GET /orgs/{}/repos", o)),
        }
        Ok(self.repos.clone())
    }
}

fn repo(name: &str, owner: &str, clone_url: Option<String>) -> Repository {
    Repository {
        name: name.into(),
        description: Some(format!("{} service", name)),
        owner: Owner { login: owner.into() },
        clone_url,
        default_branch: Some("main".into()),
        private: false,
    }
}

fn env_with_token(dir: &Path) -> EnvFile {
    let path = dir.join(".env");
    fs::write(&path, "GITHUB_TOKEN=ghp_test_token\n").unwrap();
    EnvFile::load(path).unwrap()
}

fn install_error(err: &anyhow::Error) -> &InstallError {
    err.downcast_ref::<InstallError>()
        .unwrap_or_else(|| panic!("not an InstallError: {:#}", err))
}

#[tokio::test]
async fn test_missing_token_fails_before_any_request() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let env_path = dir.path().join(".env");
    fs::write(&env_path, "GIT_REPO_NAME=old\n")?;
    let env = EnvFile::load(&env_path)?;

    let exec = common::executor(dir.path());
    let host = FakeHost::default();
    let mut installer = Installer::new(host.clone(), ScriptedPrompter::new(["0"]), &exec, env, dir.path().into());

    let err = installer.run().await.unwrap_err();
    assert!(matches!(install_error(&err), InstallError::MissingToken(_)));
    assert!(host.calls().is_empty());
    assert!(installer.prompter().asked.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_api_message_aborts_without_further_calls() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = common::executor(dir.path());
    let host = FakeHost { orgs_error: Some("Bad credentials".into()), ..Default::default() };
    let mut installer =
        Installer::new(host.clone(), ScriptedPrompter::new(["0", "1"]), &exec, env_with_token(dir.path()), dir.path().into());

    let err = installer.run().await.unwrap_err();
    assert!(matches!(install_error(&err), InstallError::Api { message } if message == "Bad credentials"));
    assert_eq!(host.calls(), vec!["GET /user", "GET /user/orgs"]);
    assert!(installer.prompter().asked.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_org_zero_fetches_personal_repositories() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = common::executor(dir.path());
    let host = FakeHost {
        orgs: vec![Organization { login: "acme".into(), description: None }],
        repos: vec![repo("widgets", "octocat", None)],
        ..Default::default()
    };
    // "5" is out of range for the single repository and stops the flow.
    let mut installer =
        Installer::new(host.clone(), ScriptedPrompter::new(["0", "5"]), &exec, env_with_token(dir.path()), dir.path().into());

    let err = installer.run().await.unwrap_err();
    assert!(matches!(install_error(&err), InstallError::InvalidSelection { min: 1, max: 1, .. }));
    assert_eq!(host.calls().last().map(String::as_str), Some("GET /user/repos"));
    assert_eq!(installer.session().organization, None);
    Ok(())
}

#[tokio::test]
async fn test_org_index_selects_organization_repositories() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = common::executor(dir.path());
    let host = FakeHost {
        orgs: vec![
            Organization { login: "acme".into(), description: Some("Acme Corp".into()) },
            Organization { login: "globex".into(), description: None },
        ],
        repos: vec![repo("widgets", "globex", None)],
        ..Default::default()
    };
    let mut installer =
        Installer::new(host.clone(), ScriptedPrompter::new(["2", "x"]), &exec, env_with_token(dir.path()), dir.path().into());

    let err = installer.run().await.unwrap_err();
    assert!(matches!(install_error(&err), InstallError::InvalidSelection { .. }));
    assert_eq!(host.calls().last().map(String::as_str), Some("GET /orgs/globex/repos"));
    assert_eq!(installer.session().organization.as_deref(), Some("globex"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_org_entry_is_fatal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = common::executor(dir.path());
    let host = FakeHost::default();
    let mut installer =
        Installer::new(host.clone(), ScriptedPrompter::new(["personal"]), &exec, env_with_token(dir.path()), dir.path().into());

    let err = installer.run().await.unwrap_err();
    assert!(matches!(install_error(&err), InstallError::InvalidSelection { min: 0, max: 0, .. }));
    assert!(!host.calls().iter().any(|c| c.contains("repos")));
    Ok(())
}

#[tokio::test]
async fn test_empty_repository_list_is_fatal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let exec = common::executor(dir.path());
    let host = FakeHost::default();
    let mut installer =
        Installer::new(host, ScriptedPrompter::new(["0"]), &exec, env_with_token(dir.path()), dir.path().into());

    let err = installer.run().await.unwrap_err();
    assert!(matches!(install_error(&err), InstallError::NoRepositories(who) if who == "octocat"));
    Ok(())
}

#[tokio::test]
async fn test_declined_overwrite_keeps_existing_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = tempfile::tempdir()?;
    let existing = base.path().join("widgets");
    fs::create_dir_all(&existing)?;
    fs::write(existing.join("keep.txt"), "local work")?;

    let exec = common::executor(dir.path());
    let host = FakeHost { repos: vec![repo("widgets", "octocat", None)], ..Default::default() };
    let answers = ["0", "1", base.path().to_str().unwrap(), "n"];
    let mut installer =
        Installer::new(host, ScriptedPrompter::new(answers), &exec, env_with_token(dir.path()), dir.path().into());

    let err = installer.run().await.unwrap_err();
    assert!(matches!(install_error(&err), InstallError::OverwriteDeclined(p) if *p == existing));
    assert_eq!(fs::read_to_string(existing.join("keep.txt"))?, "local work");
    assert!(!existing.join(".git").exists());
    Ok(())
}

#[tokio::test]
async fn test_full_flow_clones_and_persists_state() -> Result<()> {
    if !common::git_available() {
        eprintln!("git not installed; skipping");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let base = tempfile::tempdir()?;

    // A local source repository stands in for GitHub.
    let source = dir.path().join("source");
    common::init_repo(&source);

    let exec = common::executor(dir.path());
    let host = FakeHost {
        repos: vec![repo("widgets", "octocat", Some(source.to_string_lossy().into_owned()))],
        ..Default::default()
    };
    let answers = ["0", "1", base.path().to_str().unwrap()];
    let env = env_with_token(dir.path());
    let env_path = env.path().to_path_buf();
    let mut installer = Installer::new(host, ScriptedPrompter::new(answers), &exec, env, dir.path().into());

    let selection = installer.run().await?;
    let target = base.path().join("widgets");
    assert_eq!(selection.target, target);
    assert!(target.join("README.md").exists());
    assert!(selection.branch.as_deref().is_some_and(|b| !b.is_empty()));

    let env = EnvFile::load(&env_path)?;
    assert_eq!(env.get(envfile::GITHUB_TOKEN), Some("ghp_test_token"));
    assert_eq!(env.get(envfile::GIT_REPO_ORG), Some("octocat"));
    assert_eq!(env.get(envfile::GIT_REPO_NAME), Some("widgets"));
    assert!(env.get(envfile::GIT_REPO_PATH).is_some_and(|p| p.ends_with("widgets")));
    assert_eq!(env.get(envfile::GIT_REPO_BRANCH), selection.branch.as_deref());
    Ok(())
}

#[tokio::test]
async fn test_confirmed_overwrite_replaces_existing_directory() -> Result<()> {
    if !common::git_available() {
        eprintln!("git not installed; skipping");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let base = tempfile::tempdir()?;
    let source = dir.path().join("source");
    common::init_repo(&source);

    let target = base.path().join("widgets");
    fs::create_dir_all(&target)?;
    fs::write(target.join("stale.txt"), "old checkout")?;

    let exec = common::executor(dir.path());
    let host = FakeHost {
        repos: vec![repo("widgets", "octocat", Some(source.to_string_lossy().into_owned()))],
        ..Default::default()
    };
    let answers = ["0", "1", base.path().to_str().unwrap(), "y"];
    let mut installer =
        Installer::new(host, ScriptedPrompter::new(answers), &exec, env_with_token(dir.path()), dir.path().into());

    let selection = installer.run().await?;
    assert_eq!(selection.target, target);
    assert!(!target.join("stale.txt").exists());
    assert!(target.join("README.md").exists());
    assert!(installer.prompter().asked.iter().any(|q| q.contains("Overwrite?")));
    Ok(())
}
