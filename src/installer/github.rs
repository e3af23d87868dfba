//! GitHub REST client for the repository installer.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{config::Config, error::InstallError};

const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub login: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: Owner,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Source of organizations and repositories for the installer.
#[allow(async_fn_in_trait)]
pub trait RepoHost {
    async fn current_user(&self) -> Result<GitHubUser, InstallError>;
    async fn organizations(&self) -> Result<Vec<Organization>, InstallError>;
    /// `None` lists the authenticated user's own repositories.
    async fn repositories(&self, org: Option<&str>) -> Result<Vec<Repository>, InstallError>;
}

pub struct GitHubClient {
    http: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, InstallError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("provkit/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let mut hv = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| InstallError::Api { message: "token contains invalid characters".into() })?;
            hv.set_sensitive(true);
            headers.insert(AUTHORIZATION, hv);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn from_config(cfg: &Config, token: Option<&str>) -> Result<Self, InstallError> {
        let base = cfg
            .get("GITHUB_API_URL")
            .unwrap_or_else(|| "https://api.github.com".into());
        Self::new(&base, token, cfg.request_timeout())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, InstallError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        log::debug!("GET {} -> {}", url, status);
        decode(&body, status.is_success())
    }

    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, InstallError> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch: Vec<T> = self
                .get(&format!("{path}{sep}per_page={PER_PAGE}&page={page}"))
                .await?;
            let n = batch.len();
            all.extend(batch);
            if n < PER_PAGE {
                break;
            }
        }
        Ok(all)
    }
}

impl RepoHost for GitHubClient {
    async fn current_user(&self) -> Result<GitHubUser, InstallError> {
        self.get("/user").await
    }

    async fn organizations(&self) -> Result<Vec<Organization>, InstallError> {
        self.get_all("/user/orgs").await
    }

    async fn repositories(&self, org: Option<&str>) -> Result<Vec<Repository>, InstallError> {
        match org {
            None => self.get_all("/user/repos?sort=updated").await,
            Some(org) => self.get_all(&format!("/orgs/{}/repos?sort=updated", org)).await,
        }
    }
}

/// Decode a GitHub response body. An object carrying `message` is an API
/// error no matter the status.
pub fn decode<T: DeserializeOwned>(body: &str, ok_status: bool) -> Result<T, InstallError> {
    let value: Value = serde_json::from_str(body)?;
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return Err(InstallError::Api { message: message.to_string() });
    }
    if !ok_status {
        return Err(InstallError::Api { message: "request failed without an error message".into() });
    }
    Ok(serde_json::from_value(value)?)
}

/// Embed `token` into an HTTPS clone URL.
pub fn authenticated_url(clone_url: &str, token: &str) -> String {
    match clone_url.strip_prefix("https://") {
        Some(rest) => format!("https://x-access-token:{}@{}", token, rest),
        None => clone_url.to_string(),
    }
}
