//! Distribution detection from `/etc/os-release`.

use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::{error::ProvisionError, utils::shell_quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Debian,
    RedHat,
}

impl Family {
    /// Privilege group granted to the provisioned account.
    pub fn admin_group(self) -> &'static str {
        match self {
            Family::Debian => "sudo",
            Family::RedHat => "wheel",
        }
    }

    pub fn refresh_command(self) -> &'static str {
        match self {
            Family::Debian => "DEBIAN_FRONTEND=noninteractive apt-get update -y",
            Family::RedHat => "if command -v dnf >/dev/null 2>&1; then dnf makecache -y; else yum makecache -y; fi",
        }
    }

    pub fn install_command(self, packages: &[&str]) -> String {
        let list = packages.iter().map(|p| shell_quote(p)).collect::<Vec<_>>().join(" ");
        match self {
            Family::Debian => format!("DEBIAN_FRONTEND=noninteractive apt-get install -y {}", list),
            Family::RedHat => format!(
                "if command -v dnf >/dev/null 2>&1; then dnf install -y {list}; else yum install -y {list}; fi"
            ),
        }
    }

    /// Read-only check that `package` is installed.
    pub fn installed_command(self, package: &str) -> String {
        let pkg = shell_quote(package);
        match self {
            Family::Debian => format!("dpkg -s {} >/dev/null 2>&1", pkg),
            Family::RedHat => format!("rpm -q {} >/dev/null 2>&1", pkg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distro {
    pub id: String,
    pub pretty_name: String,
    pub family: Family,
}

impl Distro {
    pub fn detect() -> Result<Self> {
        Self::detect_from(Path::new("/etc/os-release"))
    }

    pub fn detect_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::parse(&text)?)
    }

    pub fn parse(os_release: &str) -> Result<Self, ProvisionError> {
        let mut id = String::new();
        let mut like = String::new();
        let mut pretty = String::new();
        for line in os_release.lines() {
            let Some((k, v)) = line.trim().split_once('=') else { continue };
            let v = v.trim().trim_matches('"').trim_matches('\'').to_string();
            match k.trim() {
                "ID" => id = v.to_ascii_lowercase(),
                "ID_LIKE" => like = v.to_ascii_lowercase(),
                "PRETTY_NAME" => pretty = v,
                _ => {}
            }
        }

        let ids: Vec<&str> = std::iter::once(id.as_str()).chain(like.split_whitespace()).collect();
        let family = if ids.iter().any(|i| matches!(*i, "debian" | "ubuntu")) {
            Family::Debian
        } else if ids
            .iter()
            .any(|i| matches!(*i, "rhel" | "fedora" | "centos" | "rocky" | "almalinux" | "amzn"))
        {
            Family::RedHat
        } else {
            let name = if id.is_empty() { "unknown".to_string() } else { id };
            return Err(ProvisionError::UnsupportedDistro(name));
        };

        if pretty.is_empty() {
            pretty = id.clone();
        }
        Ok(Self { id, pretty_name: pretty, family })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 24.04 LTS"
NAME="Ubuntu"
ID=ubuntu
ID_LIKE=debian
"#;

    const ROCKY: &str = r#"NAME="Rocky Linux"
ID="rocky"
ID_LIKE="rhel centos fedora"
PRETTY_NAME="Rocky Linux 9.3 (Blue Onyx)"
"#;

    #[test]
    fn test_ubuntu_is_debian_family() {
        let d = Distro::parse(UBUNTU).unwrap();
        assert_eq!(d.id, "ubuntu");
        assert_eq!(d.family, Family::Debian);
        assert_eq!(d.family.admin_group(), "sudo");
        assert_eq!(d.pretty_name, "Ubuntu 24.04 LTS");
    }

    #[test]
    fn test_rocky_is_redhat_family() {
        let d = Distro::parse(ROCKY).unwrap();
        assert_eq!(d.family, Family::RedHat);
        assert_eq!(d.family.admin_group(), "wheel");
    }

    #[test]
    fn test_unknown_distro_rejected() {
        let err = Distro::parse("ID=alpine\n").unwrap_err();
        assert!(matches!(err, ProvisionError::UnsupportedDistro(ref id) if id == "alpine"));
    }

    #[test]
    fn test_package_commands() {
        assert_eq!(Family::Debian.installed_command("git"), "dpkg -s git >/dev/null 2>&1");
        assert!(Family::RedHat.install_command(&["git", "curl"]).contains("dnf install -y git curl"));
    }
}
