//! Step runner: ordered, individually idempotent provisioning steps.
//!
//! Each step is `check` then `apply`. A satisfied check skips the step without
//! touching `apply`. A failed apply is a warning and the run continues, unless
//! the step is critical, in which case the run stops with
//! [`ProvisionError::CriticalStep`].

use std::{future::Future, time::Duration};

use anyhow::Result;

use crate::{
    error::ProvisionError,
    execution::{ExecutionResult, Executor},
    verify::{Check, Verifier},
};

/// A mutating shell command belonging to a step.
#[derive(Debug, Clone)]
pub struct Action {
    pub command: String,
    pub description: String,
    pub timeout: Option<Duration>,
}

impl Action {
    pub fn new(description: impl Into<String>, command: impl Into<String>) -> Self {
        Self { command: command.into(), description: description.into(), timeout: None }
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    /// `None` means the step always applies.
    pub check: Option<Check>,
    pub actions: Vec<Action>,
    pub critical: bool,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), check: None, actions: Vec::new(), critical: false }
    }

    pub fn skip_if(mut self, check: Check) -> Self {
        self.check = Some(check);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn run(self, description: impl Into<String>, command: impl Into<String>) -> Self {
        self.action(Action::new(description, command))
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Skipped,
    Applied,
    Failed { exit_code: i32 },
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub ordinal: usize,
    pub name: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<StepReport>,
}

impl RunSummary {
    fn count(&self, f: impl Fn(&StepOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| f(&r.outcome)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| *o == StepOutcome::Applied)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == StepOutcome::Skipped)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Failed { .. }))
            .map(|r| r.name.as_str())
            .collect()
    }
}

pub struct StepRunner<'a> {
    exec: &'a Executor,
    verifier: &'a Verifier<'a>,
    total: usize,
    current: usize,
    reports: Vec<StepReport>,
}

impl<'a> StepRunner<'a> {
    pub fn new(exec: &'a Executor, verifier: &'a Verifier<'a>, total: usize) -> Self {
        Self { exec, verifier, total, current: 0, reports: Vec::new() }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary { reports: self.reports.clone() }
    }

    /// Run one step: skip when `check` reports satisfied, else `apply`.
    pub async fn run_step<C, CF, A, AF>(
        &mut self,
        name: &str,
        critical: bool,
        check: C,
        apply: A,
    ) -> Result<StepOutcome>
    where
        C: FnOnce() -> CF,
        CF: Future<Output = bool>,
        A: FnOnce() -> AF,
        AF: Future<Output = Result<ExecutionResult>>,
    {
        self.current += 1;
        let total = self.total.max(self.current);
        let log = self.exec.log();
        log.step(self.current, total, name);

        let outcome = if check().await {
            log.info(format!("{} already in place, skipping", name));
            StepOutcome::Skipped
        } else {
            match apply().await {
                Ok(r) if r.success() => {
                    log.success(format!("{} complete", name));
                    StepOutcome::Applied
                }
                Ok(r) => {
                    let why = if r.timed_out { "timed out".to_string() } else { format!("exit {}", r.exit_code) };
                    log.warn(format!("{}: {} failed ({}), continuing", name, r.description, why));
                    StepOutcome::Failed { exit_code: r.exit_code }
                }
                Err(e) => {
                    log.warn(format!("{}: could not run: {:#}", name, e));
                    StepOutcome::Failed { exit_code: -1 }
                }
            }
        };

        self.reports.push(StepReport { ordinal: self.current, name: name.to_string(), outcome });

        if let (true, StepOutcome::Failed { exit_code }) = (critical, outcome) {
            log.error(format!("{} is required; aborting", name));
            return Err(ProvisionError::CriticalStep { step: name.to_string(), code: exit_code }.into());
        }
        Ok(outcome)
    }

    /// Run a planned step: its check through the verifier, its actions through
    /// the executor, stopping at the first failing action.
    pub async fn run_planned(&mut self, step: &Step) -> Result<StepOutcome> {
        let verifier = self.verifier;
        let exec = self.exec;
        let check = step.check.clone();
        self.run_step(
            &step.name,
            step.critical,
            move || async move {
                match &check {
                    Some(c) => verifier.check(c).await,
                    None => false,
                }
            },
            || apply_actions(exec, &step.actions),
        )
        .await
    }

    pub async fn run_all(&mut self, steps: &[Step]) -> Result<RunSummary> {
        self.total = self.current + steps.len();
        for step in steps {
            self.run_planned(step).await?;
        }
        Ok(self.summary())
    }
}

async fn apply_actions(exec: &Executor, actions: &[Action]) -> Result<ExecutionResult> {
    let mut last = ExecutionResult { description: "nothing to do".into(), ..Default::default() };
    for a in actions {
        last = exec.run_with_timeout(&a.command, &a.description, a.timeout).await?;
        if !last.success() {
            break;
        }
    }
    Ok(last)
}
