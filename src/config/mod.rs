use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

pub mod envfile;

pub use envfile::EnvFile;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(default_config_path())
    }

    pub fn load_from(config_path: PathBuf) -> Self {
        let mut map = default_map();

        // Read provkitrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_secs(&self, key: &str) -> Option<Duration> {
        self.get(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split([',', ' '])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn provision_user(&self) -> String {
        self.get("PROVISION_USER").unwrap_or_else(|| "claude-user".into())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.get("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_log_dir)
    }

    pub fn live_tail_lines(&self) -> usize {
        self.get_usize("LIVE_TAIL_LINES").unwrap_or(8).max(1)
    }

    pub fn verify_timeout(&self) -> Duration {
        self.get_secs("VERIFY_TIMEOUT").unwrap_or(Duration::from_secs(30))
    }

    pub fn request_timeout(&self) -> Duration {
        self.get_secs("REQUEST_TIMEOUT").unwrap_or(Duration::from_secs(60))
    }

    pub fn env_file_path(&self) -> PathBuf {
        PathBuf::from(self.get("ENV_FILE").unwrap_or_else(|| ".env".into()))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.get("LOG_LEVEL")
            .and_then(|v| v.parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or PROVKIT_* for forward-compat
    const KEYS: &[&str] = &[
        "PROVISION_USER",
        "PROVISION_SHELL",
        "NVM_VERSION",
        "NODE_VERSION",
        "NPM_GLOBAL_PACKAGES",
        "PASSWORDLESS_SUDO",
        "LIVE_TAIL_LINES",
        "VERIFY_TIMEOUT",
        "LOG_DIR",
        "LOG_LEVEL",
        "GITHUB_API_URL",
        "GITHUB_HOST",
        "REQUEST_TIMEOUT",
        "ENV_FILE",
        "REPO_BASE_DIR",
    ];

    KEYS.contains(&k) || k.starts_with("PROVKIT_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("provkit").join("provkitrc")
}

fn default_log_dir() -> PathBuf {
    if is_root() {
        return PathBuf::from("/var/log/provkit");
    }
    BaseDirs::new()
        .map(|b| b.data_local_dir().join("provkit").join("logs"))
        .unwrap_or_else(|| env::temp_dir().join("provkit").join("logs"))
}

/// Effective uid check via `id -u`; anything unreadable counts as non-root.
pub fn effective_uid() -> Option<u32> {
    let out = std::process::Command::new("id").arg("-u").output().ok()?;
    String::from_utf8_lossy(&out.stdout).trim().parse().ok()
}

pub fn is_root() -> bool {
    effective_uid() == Some(0)
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Account
    m.insert("PROVISION_USER".into(), "claude-user".into());
    m.insert("PROVISION_SHELL".into(), "/bin/bash".into());
    m.insert("PASSWORDLESS_SUDO".into(), "true".into());

    // Node tooling
    m.insert("NVM_VERSION".into(), "v0.39.7".into());
    m.insert("NODE_VERSION".into(), "lts".into());
    m.insert("NPM_GLOBAL_PACKAGES".into(), "@anthropic-ai/claude-code".into());

    // Runner
    m.insert("LIVE_TAIL_LINES".into(), "8".into());
    m.insert("VERIFY_TIMEOUT".into(), "30".into());
    m.insert("LOG_LEVEL".into(), "info".into());

    // Installer
    m.insert("GITHUB_API_URL".into(), "https://api.github.com".into());
    m.insert("GITHUB_HOST".into(), "github.com".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("ENV_FILE".into(), ".env".into());

    m
}
