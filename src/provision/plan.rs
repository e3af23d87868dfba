//! Provisioning plans: the ordered steps and final verification sweep for
//! each profile.

use std::time::Duration;

use clap::ValueEnum;

use super::distro::{Distro, Family};
use crate::{
    config::Config,
    runner::{Action, Step},
    utils::shell_quote,
    verify::{Check, Verification},
};

const DOCKER_INSTALL_SCRIPT: &str = "https://get.docker.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Docker engine and compose plugin.
    Docker,
    /// Privileged service account.
    User,
    /// nvm, Node.js and global npm packages for the service account.
    Node,
    /// Everything above, in order.
    Combined,
}

impl Profile {
    fn docker(self) -> bool {
        matches!(self, Profile::Docker | Profile::Combined)
    }

    fn user(self) -> bool {
        matches!(self, Profile::User | Profile::Combined)
    }

    fn node(self) -> bool {
        matches!(self, Profile::Node | Profile::Combined)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub user: String,
    pub shell: String,
    pub nvm_version: String,
    pub node_version: String,
    pub npm_packages: Vec<String>,
    pub passwordless_sudo: bool,
    pub verify_timeout: Duration,
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            user: cfg.provision_user(),
            shell: cfg.get("PROVISION_SHELL").unwrap_or_else(|| "/bin/bash".into()),
            nvm_version: cfg.get("NVM_VERSION").unwrap_or_else(|| "v0.39.7".into()),
            node_version: cfg.get("NODE_VERSION").unwrap_or_else(|| "lts".into()),
            npm_packages: cfg.get_list("NPM_GLOBAL_PACKAGES"),
            passwordless_sudo: cfg.get_bool("PASSWORDLESS_SUDO"),
            verify_timeout: cfg.verify_timeout(),
        }
    }

    fn sudoers_path(&self) -> String {
        format!("/etc/sudoers.d/{}", self.user)
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub steps: Vec<Step>,
    pub verifications: Vec<Verification>,
}

pub fn build(profile: Profile, distro: &Distro, s: &Settings) -> Plan {
    let family = distro.family;
    let mut steps = vec![base_packages(family)];
    let mut verifications = Vec::new();

    if profile.docker() {
        steps.extend(docker_steps(family));
        verifications.extend(docker_checks(s));
    }
    if profile.user() {
        steps.extend(user_steps(family, s, profile.docker()));
        verifications.extend(user_checks(family, s, profile.docker()));
    } else if profile.node() {
        // Node tooling lives in the account's home, so it must exist.
        steps.push(create_user(s));
        verifications.push(user_exists(s));
    }
    if profile.node() {
        steps.extend(node_steps(s));
        verifications.extend(node_checks(s));
    }

    Plan { steps, verifications }
}

/// Run `cmd` in a login shell of `user`.
pub fn as_user(user: &str, cmd: &str) -> String {
    format!("su - {} -c {}", shell_quote(user), shell_quote(cmd))
}

fn with_nvm(cmd: &str) -> String {
    format!("export NVM_DIR=\"$HOME/.nvm\"; . \"$NVM_DIR/nvm.sh\" && {}", cmd)
}

fn in_group(user: &str, group: &str) -> String {
    format!("id -nG {} | tr ' ' '\\n' | grep -qx {}", shell_quote(user), shell_quote(group))
}

fn base_packages(family: Family) -> Step {
    let packages: &[&str] = match family {
        Family::Debian => &["curl", "git", "ca-certificates", "gnupg", "sudo"],
        Family::RedHat => &["curl", "git", "ca-certificates", "gnupg2", "sudo"],
    };
    let check = packages
        .iter()
        .map(|p| family.installed_command(p))
        .collect::<Vec<_>>()
        .join(" && ");
    Step::new("Install base packages")
        .skip_if(Check::Command(check))
        .run("refresh package index", family.refresh_command())
        .run("install base packages", family.install_command(packages))
}

fn docker_steps(family: Family) -> Vec<Step> {
    vec![
        Step::new("Install Docker engine")
            .skip_if(Check::binary("docker"))
            .run(
                "download Docker install script",
                format!("curl -fsSL {} -o /tmp/get-docker.sh", DOCKER_INSTALL_SCRIPT),
            )
            .run("run Docker install script", "sh /tmp/get-docker.sh"),
        Step::new("Enable Docker service")
            .skip_if(Check::command("systemctl is-active --quiet docker"))
            .run("enable and start docker", "systemctl enable --now docker"),
        Step::new("Install Docker Compose plugin")
            .skip_if(Check::command("docker compose version >/dev/null 2>&1"))
            .run("install compose plugin", family.install_command(&["docker-compose-plugin"])),
    ]
}

fn create_user(s: &Settings) -> Step {
    Step::new(format!("Create user {}", s.user))
        .skip_if(Check::Command(format!("id -u {} >/dev/null 2>&1", shell_quote(&s.user))))
        .run(
            "create account",
            format!("useradd -m -s {} {}", shell_quote(&s.shell), shell_quote(&s.user)),
        )
        .critical()
}

fn user_steps(family: Family, s: &Settings, docker: bool) -> Vec<Step> {
    let group = family.admin_group();
    let mut steps = vec![
        create_user(s),
        Step::new(format!("Grant {} membership", group))
            .skip_if(Check::Command(in_group(&s.user, group)))
            .run("add to admin group", format!("usermod -aG {} {}", group, shell_quote(&s.user)))
            .critical(),
    ];

    if s.passwordless_sudo {
        let rule = format!("{} ALL=(ALL) NOPASSWD:ALL", s.user);
        let target = s.sudoers_path();
        steps.push(
            Step::new("Configure passwordless sudo")
                .skip_if(Check::path(&target))
                .run(
                    "write sudoers drop-in",
                    format!(
                        "tmp=$(mktemp) && printf '%s\\n' {} > \"$tmp\" && visudo -cf \"$tmp\" && install -m 0440 \"$tmp\" {}; rc=$?; rm -f \"$tmp\"; exit $rc",
                        shell_quote(&rule),
                        shell_quote(&target)
                    ),
                ),
        );
    }

    if docker {
        steps.push(
            Step::new("Add user to docker group")
                .skip_if(Check::Command(in_group(&s.user, "docker")))
                .run(
                    "add to docker group",
                    format!(
                        "(getent group docker >/dev/null || groupadd docker) && usermod -aG docker {}",
                        shell_quote(&s.user)
                    ),
                ),
        );
    }
    steps
}

fn node_install(s: &Settings) -> (String, String) {
    if s.node_version.eq_ignore_ascii_case("lts") {
        (
            "command -v node >/dev/null 2>&1".to_string(),
            "nvm install --lts && nvm alias default 'lts/*'".to_string(),
        )
    } else {
        let v = shell_quote(&s.node_version);
        (
            format!("nvm which {} >/dev/null 2>&1", v),
            format!("nvm install {v} && nvm alias default {v}"),
        )
    }
}

fn node_steps(s: &Settings) -> Vec<Step> {
    let (node_check, node_apply) = node_install(s);
    let mut steps = vec![
        Step::new("Install nvm")
            .skip_if(Check::Command(as_user(&s.user, "test -s \"$HOME/.nvm/nvm.sh\"")))
            .run(
                "run nvm installer",
                as_user(
                    &s.user,
                    &format!(
                        "curl -fsSL https://raw.githubusercontent.com/nvm-sh/nvm/{}/install.sh | bash",
                        s.nvm_version
                    ),
                ),
            ),
        Step::new(format!("Install Node.js ({})", s.node_version))
            .skip_if(Check::Command(as_user(&s.user, &with_nvm(&node_check))))
            .run("nvm install", as_user(&s.user, &with_nvm(&node_apply))),
    ];

    for pkg in &s.npm_packages {
        let p = shell_quote(pkg);
        steps.push(
            Step::new(format!("Install npm package {}", pkg))
                .skip_if(Check::Command(as_user(
                    &s.user,
                    &with_nvm(&format!("npm ls -g --depth=0 {} >/dev/null 2>&1", p)),
                )))
                .action(Action::new(
                    format!("npm install -g {}", pkg),
                    as_user(&s.user, &with_nvm(&format!("npm install -g {}", p))),
                )),
        );
    }
    steps
}

fn docker_checks(s: &Settings) -> Vec<Verification> {
    vec![
        Verification::new("Docker CLI", Check::command("docker --version >/dev/null 2>&1")),
        Verification::new("Docker daemon", Check::command("docker info >/dev/null 2>&1"))
            .messages("daemon is running", "daemon is not reachable"),
        Verification::new("Docker Compose", Check::command("docker compose version >/dev/null 2>&1")),
        Verification::new("Container run", Check::command("docker run --rm hello-world >/dev/null 2>&1"))
            .messages("hello-world container ran", "could not run hello-world container")
            .timeout(s.verify_timeout),
    ]
}

fn user_exists(s: &Settings) -> Verification {
    Verification::new(
        format!("User {}", s.user),
        Check::Command(format!("id -u {} >/dev/null 2>&1", shell_quote(&s.user))),
    )
    .messages("account exists", "account does not exist")
}

fn user_checks(family: Family, s: &Settings, docker: bool) -> Vec<Verification> {
    let group = family.admin_group();
    let mut v = vec![
        user_exists(s),
        Verification::new(format!("{} group", group), Check::Command(in_group(&s.user, group)))
            .messages(format!("{} is in {}", s.user, group), format!("{} is not in {}", s.user, group)),
    ];
    if s.passwordless_sudo {
        v.push(
            Verification::new(
                "Passwordless sudo",
                Check::Command(format!("visudo -cf {} >/dev/null 2>&1", shell_quote(&s.sudoers_path()))),
            )
            .messages("sudoers drop-in is valid", "sudoers drop-in missing or invalid"),
        );
    }
    if docker {
        v.push(
            Verification::new("docker group", Check::Command(in_group(&s.user, "docker")))
                .messages(format!("{} can use docker", s.user), format!("{} is not in docker group", s.user)),
        );
    }
    v
}

fn node_checks(s: &Settings) -> Vec<Verification> {
    let mut v = vec![
        Verification::new("nvm", Check::Command(as_user(&s.user, "test -s \"$HOME/.nvm/nvm.sh\""))),
        Verification::new("Node.js", Check::Command(as_user(&s.user, &with_nvm("node --version >/dev/null 2>&1")))),
        Verification::new("npm", Check::Command(as_user(&s.user, &with_nvm("npm --version >/dev/null 2>&1")))),
    ];
    for pkg in &s.npm_packages {
        v.push(Verification::new(
            pkg.clone(),
            Check::Command(as_user(
                &s.user,
                &with_nvm(&format!("npm ls -g --depth=0 {} >/dev/null 2>&1", shell_quote(pkg))),
            )),
        ));
    }
    v
}
