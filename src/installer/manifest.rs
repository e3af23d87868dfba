//! Dependency manifest and compose file detection in a cloned repository.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub file: &'static str,
    pub ecosystem: &'static str,
    pub install: String,
}

const COMPOSE_FILES: &[&str] = &["compose.yaml", "compose.yml", "docker-compose.yml", "docker-compose.yaml"];

pub fn detect_manifests(dir: &Path) -> Vec<Manifest> {
    let has = |f: &str| dir.join(f).is_file();
    let mut found = Vec::new();

    if has("package.json") {
        let install = if has("pnpm-lock.yaml") {
            "pnpm install"
        } else if has("yarn.lock") {
            "yarn install"
        } else if has("package-lock.json") {
            "npm ci"
        } else {
            "npm install"
        };
        found.push(Manifest { file: "package.json", ecosystem: "Node.js", install: install.into() });
    }

    let simple: &[(&str, &str, &str)] = &[
        ("requirements.txt", "Python", "python3 -m pip install -r requirements.txt"),
        ("Cargo.toml", "Rust", "cargo fetch"),
        ("go.mod", "Go", "go mod download"),
        ("Gemfile", "Ruby", "bundle install"),
        ("composer.json", "PHP", "composer install"),
    ];
    for &(file, ecosystem, install) in simple {
        if has(file) {
            found.push(Manifest { file, ecosystem, install: install.to_string() });
        }
    }
    found
}

pub fn detect_compose(dir: &Path) -> Option<PathBuf> {
    COMPOSE_FILES
        .iter()
        .map(|f| dir.join(f))
        .find(|p| p.is_file())
}
