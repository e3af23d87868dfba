use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::provision::Profile;

#[derive(Parser, Debug, Clone)]
#[command(name = "provkit", about = "Idempotent host provisioning and repository installer", version)]
pub struct Cli {
    /// Directory for setup_<ts>.log and errors_<ts>.log (overrides LOG_DIR).
    #[arg(long = "log-dir", global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Provision this host (requires root). Completed steps are skipped.
    Provision {
        #[arg(long, value_enum, default_value_t = Profile::Combined)]
        profile: Profile,
    },
    /// Run only the verification sweep; exits 1 if any check fails.
    Verify {
        #[arg(long, value_enum, default_value_t = Profile::Combined)]
        profile: Profile,
    },
    /// Pick a GitHub repository, clone it and optionally start its compose stack.
    #[command(name = "install-repo")]
    InstallRepo {
        /// Env file holding GITHUB_TOKEN (overrides ENV_FILE).
        #[arg(long = "env-file")]
        env_file: Option<PathBuf>,
    },
    /// Commit and push the repository recorded by install-repo.
    Push {
        #[arg(long = "env-file")]
        env_file: Option<PathBuf>,
        /// Commit message for pending changes.
        #[arg(short = 'm', long, default_value = "Update from provkit")]
        message: String,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
