//! CLI command definitions.

use clap::Subcommand;
use forkkeep_tasks::Platform;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Decide whether a workflow runs for an event
    Guard {
        /// Workflow name (looked up in the workflows dir) or file
        workflow: String,

        /// Event payload file
        #[arg(short, long)]
        event: PathBuf,

        /// GitHub event name; without it the file holds a forkkeep event
        #[arg(long, env = "GITHUB_EVENT_NAME")]
        event_name: Option<String>,

        /// Exit with status 1 when the workflow is skipped
        #[arg(long)]
        exit_code: bool,
    },

    /// Run a workflow for an event
    Run {
        /// Workflow name (looked up in the workflows dir) or file
        workflow: String,

        /// Event payload file
        #[arg(short, long)]
        event: PathBuf,

        /// GitHub event name; without it the file holds a forkkeep event
        #[arg(long, env = "GITHUB_EVENT_NAME")]
        event_name: Option<String>,

        /// Working directory for the run (a fresh temporary one by default)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Validate workflow definitions
    Validate {
        /// Workflow file or directory (defaults to the workflows dir)
        path: Option<PathBuf>,
    },

    /// Merge a new upstream release into the autoupdate pull request
    Sync {
        /// Fork checkout
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Build the integration into a directory
    Build {
        /// Output directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Platform to bundle dependencies for (windows or macos; defaults to the host)
        #[arg(long)]
        platform: Option<Platform>,

        /// Fork checkout
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Zip built assets and publish a release
    Release {
        /// Build directory holding windows*/macos* assets
        #[arg(short, long)]
        dir: PathBuf,

        /// Fork checkout
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Point current_version.json at the latest release
    UpdateReleaseFile {
        /// Fork checkout
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Send a repository_dispatch event
    Dispatch {
        /// Target repository (owner/name)
        #[arg(short, long)]
        target: String,

        /// Event type
        #[arg(short, long)]
        event: String,
    },

    /// Fork an upstream integration and prepare it for syncing
    Onboard {
        /// Upstream repository (owner/name)
        upstream: String,

        /// Token of the bot account accepting the collaborator invitation
        #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
        bot_token: Option<String>,

        /// Sync configuration listing the forks
        #[arg(long, default_value = "config.json")]
        sync_config: PathBuf,

        /// Seconds to wait for the bot invitation
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
}
