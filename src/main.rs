use std::process::ExitCode;

use owo_colors::OwoColorize;
use provkit::{
    cli::{Cli, Command},
    config::Config,
    error::Reported,
    handlers::{self, Context},
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let ctx = Context { cfg: Config::load(), log_dir: args.log_dir };

    let result = match args.command {
        Command::Provision { profile } => handlers::provision::run(&ctx, profile).await,
        Command::Verify { profile } => handlers::provision::verify(&ctx, profile).await,
        Command::InstallRepo { env_file } => handlers::install::run(&ctx, env_file).await,
        Command::Push { env_file, message } => handlers::push::run(&ctx, env_file, &message).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is::<Reported>() {
                eprintln!("{} {:#}", "error:".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}
