//! forkkeep CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;

use commands::Commands;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "forkkeep")]
#[command(author, version, about = "Friends of Galaxy fork maintenance", long_about = None)]
struct Cli {
    /// GitHub token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Repository to act on (defaults to <owner>/<current dir name>)
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;
    let ctx = handlers::Context::new(config, cli.token, cli.repo);

    match cli.command {
        Commands::Guard {
            workflow,
            event,
            event_name,
            exit_code,
        } => {
            let run = handlers::guard(&ctx, &workflow, &event, event_name.as_deref())?;
            if !run && exit_code {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Run {
            workflow,
            event,
            event_name,
            workspace,
        } => {
            if !handlers::run(&ctx, &workflow, &event, event_name.as_deref(), workspace).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Validate { path } => handlers::validate(&ctx, path.as_deref())?,
        Commands::Sync { path } => handlers::sync(&ctx, &path).await?,
        Commands::Build {
            dir,
            platform,
            path,
        } => handlers::build(&ctx, &path, &dir, platform).await?,
        Commands::Release { dir, path } => handlers::release(&ctx, &path, &dir).await?,
        Commands::UpdateReleaseFile { path } => handlers::update_release_file(&ctx, &path).await?,
        Commands::Dispatch { target, event } => handlers::dispatch(&ctx, &target, &event).await?,
        Commands::Onboard {
            upstream,
            bot_token,
            sync_config,
            timeout,
        } => handlers::onboard(&ctx, &upstream, bot_token, sync_config, timeout).await?,
    }

    Ok(ExitCode::SUCCESS)
}
