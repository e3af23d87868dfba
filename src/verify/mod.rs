//! Component verifier: side-effect-free checks reporting pass/fail.

use std::{path::PathBuf, time::Duration};

use crate::{execution::Executor, utils::shell_quote};

/// How to decide whether a component is in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// Shell command; exit 0 means satisfied.
    Command(String),
    /// Executable resolvable on `PATH`.
    Binary(String),
    PathExists(PathBuf),
}

impl Check {
    pub fn command(cmd: impl Into<String>) -> Self {
        Self::Command(cmd.into())
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::Binary(name.into())
    }

    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::PathExists(p.into())
    }

    fn shell_command(&self) -> Option<String> {
        match self {
            Check::Command(c) => Some(c.clone()),
            Check::Binary(b) => Some(format!("command -v {} >/dev/null 2>&1", shell_quote(b))),
            Check::PathExists(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub component: String,
    pub passed: bool,
    pub message: String,
}

/// One entry of a verification sweep.
#[derive(Debug, Clone)]
pub struct Verification {
    pub component: String,
    pub check: Check,
    pub success: String,
    pub failure: String,
    pub timeout: Option<Duration>,
}

impl Verification {
    pub fn new(component: impl Into<String>, check: Check) -> Self {
        let component = component.into();
        Self {
            success: format!("{} is installed", component),
            failure: format!("{} is missing or broken", component),
            component,
            check,
            timeout: None,
        }
    }

    pub fn messages(mut self, success: impl Into<String>, failure: impl Into<String>) -> Self {
        self.success = success.into();
        self.failure = failure.into();
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub outcomes: Vec<VerificationOutcome>,
}

impl VerificationReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("|Component|Status|Details|\n|:-|:-:|:-|\n");
        for o in &self.outcomes {
            let status = if o.passed { "PASS" } else { "FAIL" };
            md.push_str(&format!(
                "|{}|{}|{}|\n",
                escape_cell(&o.component),
                status,
                escape_cell(&o.message)
            ));
        }
        md
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

pub struct Verifier<'a> {
    exec: &'a Executor,
    default_timeout: Option<Duration>,
}

impl<'a> Verifier<'a> {
    pub fn new(exec: &'a Executor) -> Self {
        Self { exec, default_timeout: None }
    }

    /// Bound every check that doesn't carry its own timeout.
    pub fn with_default_timeout(mut self, limit: Duration) -> Self {
        self.default_timeout = Some(limit);
        self
    }

    /// Evaluate `check` fresh. Spawn errors count as "not satisfied".
    pub async fn check(&self, check: &Check) -> bool {
        self.check_within(check, self.default_timeout).await
    }

    async fn check_within(&self, check: &Check, timeout: Option<Duration>) -> bool {
        match check.shell_command() {
            Some(cmd) => match self.exec.probe(&cmd, timeout).await {
                Ok(r) => r.success(),
                Err(e) => {
                    log::warn!("check could not run: {:#}", e);
                    false
                }
            },
            None => match check {
                Check::PathExists(p) => p.exists(),
                _ => false,
            },
        }
    }

    pub async fn verify(
        &self,
        component: &str,
        check: &Check,
        success: &str,
        failure: &str,
        timeout: Option<Duration>,
    ) -> VerificationOutcome {
        let passed = self
            .check_within(check, timeout.or(self.default_timeout))
            .await;
        let outcome = VerificationOutcome {
            component: component.to_string(),
            passed,
            message: if passed { success } else { failure }.to_string(),
        };
        let log = self.exec.log();
        if passed {
            log.success(format!("{}: {}", component, outcome.message));
        } else {
            log.warn(format!("{}: {}", component, outcome.message));
        }
        outcome
    }

    /// Run every verification in order and aggregate the verdict.
    pub async fn sweep(&self, items: &[Verification]) -> VerificationReport {
        let mut report = VerificationReport::default();
        for v in items {
            let outcome = self
                .verify(&v.component, &v.check, &v.success, &v.failure, v.timeout)
                .await;
            report.outcomes.push(outcome);
        }
        report
    }
}
