//! Installer environment file: `KEY=value` lines holding the GitHub token and
//! the last cloned repository.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const GIT_REPO_ORG: &str = "GIT_REPO_ORG";
pub const GIT_REPO_NAME: &str = "GIT_REPO_NAME";
pub const GIT_REPO_BRANCH: &str = "GIT_REPO_BRANCH";
pub const GIT_REPO_PATH: &str = "GIT_REPO_PATH";

#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl EnvFile {
    /// Load the file; a missing file is an empty environment.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = Vec::new();
        if path.exists() {
            let iter = dotenvy::from_path_iter(&path)
                .with_context(|| format!("reading env file {}", path.display()))?;
            for item in iter {
                let (k, v) = item.with_context(|| format!("parsing env file {}", path.display()))?;
                entries.retain(|(key, _): &(String, String)| key != &k);
                entries.push((k, v));
            }
        }
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Non-empty value for `key`.
    pub fn require(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Rewrite the file: drop every line assigning one of `pairs`' keys, keep the
    /// rest verbatim, then append the new values.
    pub fn update(&mut self, pairs: &[(&str, String)]) -> Result<()> {
        let existing = if self.path.exists() {
            fs::read_to_string(&self.path)
                .with_context(|| format!("reading env file {}", self.path.display()))?
        } else {
            String::new()
        };

        let mut out = String::new();
        for line in existing.lines() {
            let replaced = line_key(line)
                .map(|k| pairs.iter().any(|(p, _)| *p == k))
                .unwrap_or(false);
            if !replaced {
                out.push_str(line);
                out.push('\n');
            }
        }
        for (k, v) in pairs {
            out.push_str(&format!("{}={}\n", k, format_value(v)));
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&self.path, out)
            .with_context(|| format!("writing env file {}", self.path.display()))?;

        for (k, v) in pairs {
            self.entries.retain(|(key, _)| key != k);
            self.entries.push((k.to_string(), v.clone()));
        }
        Ok(())
    }
}

fn line_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    line.split_once('=').map(|(k, _)| k.trim())
}

fn format_value(v: &str) -> String {
    let needs_quotes = v.is_empty()
        || v.chars().any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\'));
    if needs_quotes {
        format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"").replace('$', "\\$"))
    } else {
        v.to_string()
    }
}
