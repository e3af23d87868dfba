//! Host provisioning: preconditions, plan execution and the verification sweep.

use anyhow::Result;

use crate::{
    config,
    error::ProvisionError,
    execution::Executor,
    runner::{RunSummary, StepRunner},
    verify::{VerificationReport, Verifier},
};

pub mod distro;
pub mod plan;

pub use distro::{Distro, Family};
pub use plan::{Plan, Profile, Settings};

pub fn ensure_root() -> Result<(), ProvisionError> {
    match config::effective_uid() {
        Some(0) => Ok(()),
        Some(uid) => Err(ProvisionError::NotRoot(uid)),
        None => Err(ProvisionError::UnknownUid),
    }
}

/// Run every step of `plan`, then sweep its verifications.
///
/// A critical step failure returns early with an error; other failures are
/// reflected in the summary and the report.
pub async fn execute(exec: &Executor, verifier: &Verifier<'_>, plan: &Plan) -> Result<(RunSummary, VerificationReport)> {
    let mut runner = StepRunner::new(exec, verifier, plan.steps.len());
    let summary = runner.run_all(&plan.steps).await?;

    exec.log().section("Verification");
    let report = verifier.sweep(&plan.verifications).await;
    Ok((summary, report))
}
