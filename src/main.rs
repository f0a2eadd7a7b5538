mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

use shellkit::commands;
use shellkit::config;
use shellkit::shell::CommandRunner;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("shellkit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the process exit code.
fn run(cli: Cli) -> Result<i32> {
    let config_path = config::config_path(cli.config.as_deref())?;
    let runner = CommandRunner::new();

    match cli.command {
        Command::Identity => {
            let result = commands::cmd_identity(&runner);
            output(&result, cli.json, commands::format_identity_human)?;
        }
        Command::Run {
            cwd,
            check,
            no_check,
            stdout,
            stderr,
            env,
            cmd,
        } => {
            let config = config::load_config(&config_path)?;
            let inputs = commands::RunInputs {
                cmd,
                cwd,
                check: Command::check_override(check, no_check),
                stdout,
                stderr,
                env,
            };

            let result = commands::cmd_run(&runner, inputs, &config.run)?;
            if !cli.json {
                if let Some(captured) = &result.stderr {
                    eprint!("{}", captured);
                }
            }
            output(&result, cli.json, commands::format_run_human)?;
            return Ok(result.code);
        }
        Command::ConfigPath => {
            println!("{}", config_path.display());
        }
    }
    Ok(0)
}

fn output<T: serde::Serialize>(result: &T, json: bool, human_fn: fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let text = human_fn(result);
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}
