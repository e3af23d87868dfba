//! `provision` and `verify` subcommands.

use anyhow::{bail, Result};
use owo_colors::OwoColorize;

use super::Context;
use crate::{
    printer::{banner, MarkdownPrinter},
    provision::{self, plan, Distro, Profile, Settings},
    utils::Redactor,
    verify::{VerificationReport, Verifier},
};

pub async fn run(ctx: &Context, profile: Profile) -> Result<()> {
    provision::ensure_root()?;
    let distro = Distro::detect()?;
    let settings = Settings::from_config(&ctx.cfg);
    let plan = plan::build(profile, &distro, &settings);

    let (log, exec) = ctx.start_run(Redactor::new())?;
    banner(
        "Host provisioning",
        &format!("{} | profile {:?} | user {}", distro.pretty_name, profile, settings.user),
    );
    log.info(format!("Logging to {}", log.setup_path().display()));

    let verifier = Verifier::new(&exec).with_default_timeout(settings.verify_timeout);
    let (summary, report) = provision::execute(&exec, &verifier, &plan).await?;

    log.section("Summary");
    log.info(format!(
        "{} applied, {} skipped, {} failed",
        summary.applied(),
        summary.skipped(),
        summary.failed().len()
    ));
    for name in summary.failed() {
        log.warn(format!("step failed: {}", name));
    }
    print_report(&report);
    if report.all_passed() {
        log.success("All components verified");
    } else {
        log.warn(format!(
            "Some components failed verification; see {}",
            log.error_path().display()
        ));
    }
    Ok(())
}

pub async fn verify(ctx: &Context, profile: Profile) -> Result<()> {
    let distro = Distro::detect()?;
    let settings = Settings::from_config(&ctx.cfg);
    let plan = plan::build(profile, &distro, &settings);

    let (log, exec) = ctx.start_run(Redactor::new())?;
    log.section("Verification");
    let verifier = Verifier::new(&exec).with_default_timeout(settings.verify_timeout);
    let report = verifier.sweep(&plan.verifications).await;
    print_report(&report);

    if !report.all_passed() {
        let failed: Vec<&str> = report.failed().map(|o| o.component.as_str()).collect();
        bail!("verification failed: {}", failed.join(", "));
    }
    log.success("All components verified");
    Ok(())
}

fn print_report(report: &VerificationReport) {
    println!();
    MarkdownPrinter::default().print(&report.to_markdown());
    let verdict = if report.all_passed() { "PASS".green().bold().to_string() } else { "FAIL".red().bold().to_string() };
    println!("Verdict: {}", verdict);
}
