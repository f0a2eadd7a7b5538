use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shellkit::shell::Redirect;

#[derive(Parser)]
#[command(name = "shellkit", about = "Run external commands with an environment overlay")]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: $SHELLKIT_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the git user name and email, or the default identity
    Identity,
    /// Run a command once with the current environment plus overrides
    Run {
        /// Working directory (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Fail when the command exits non-zero
        #[arg(long, conflicts_with = "no_check")]
        check: bool,
        /// Return the exit code instead of failing (overrides config)
        #[arg(long)]
        no_check: bool,
        /// stdout mode: inherit, discard or capture
        #[arg(long, value_name = "MODE")]
        stdout: Option<Redirect>,
        /// stderr mode: inherit, discard or capture
        #[arg(long, value_name = "MODE")]
        stderr: Option<Redirect>,
        /// Environment override NAME=value (repeatable)
        #[arg(long = "env", short = 'e', value_name = "NAME=VALUE")]
        env: Vec<String>,
        /// Command and arguments to run
        #[arg(last = true)]
        cmd: Vec<String>,
    },
    /// Print the config file path and exit
    ConfigPath,
}

impl Command {
    /// Tri-state check flag: `None` defers to config.
    pub fn check_override(check: bool, no_check: bool) -> Option<bool> {
        match (check, no_check) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
