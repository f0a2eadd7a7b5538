//! Helpers for shelling out: look up the git user identity with a safe
//! fallback, and run external commands with an environment overlay.

pub mod commands;
pub mod config;
pub mod env;
pub mod paths;
pub mod shell;
mod testutil;

pub use shell::{
    get_vcs_identity, run_command, CommandRunner, CommandSpec, CompletedProcess, Identity,
    Redirect, ShellError,
};
