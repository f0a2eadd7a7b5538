use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::RunDefaults;
use crate::env::EnvOverlay;
use crate::paths::pick_cwd;
use crate::shell::{CommandRunner, CommandSpec, ProcessHost, Redirect};

pub struct RunInputs {
    pub cmd: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// `None` defers to the config file.
    pub check: Option<bool>,
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
    /// Raw `KEY=VALUE` pairs from `--env`.
    pub env: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub argv: Vec<String>,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

pub fn build_spec(inputs: RunInputs, defaults: &RunDefaults) -> Result<CommandSpec> {
    let mut overlay = defaults.env.clone();
    overlay.extend(&EnvOverlay::parse_pairs(&inputs.env)?);

    let mut spec = CommandSpec::from_argv(inputs.cmd)
        .context("no command specified")?
        .check(inputs.check.unwrap_or(defaults.check))
        .stdout(inputs.stdout.unwrap_or(defaults.stdout))
        .stderr(inputs.stderr.unwrap_or(defaults.stderr))
        .envs(&overlay);

    if let Some(cwd) = pick_cwd(inputs.cwd.as_deref(), defaults.cwd.as_deref()) {
        spec = spec.cwd(cwd);
    }
    Ok(spec)
}

pub fn cmd_run<H: ProcessHost>(
    runner: &CommandRunner<H>,
    inputs: RunInputs,
    defaults: &RunDefaults,
) -> Result<RunResult> {
    let spec = build_spec(inputs, defaults)?;
    let completed = runner.run_command(&spec)?;

    Ok(RunResult {
        stdout: completed.stdout_str(),
        stderr: completed.stderr_str(),
        argv: completed.argv,
        code: completed.code,
    })
}

/// Captured stdout, if any. Captured stderr is written by the caller.
pub fn format_run_human(result: &RunResult) -> String {
    result
        .stdout
        .as_deref()
        .map(|s| s.trim_end_matches('\n').to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ShellError;
    use crate::testutil::{env_map, FakeHost, FAKE_CWD};

    fn inputs(cmd: &[&str]) -> RunInputs {
        RunInputs {
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
            cwd: None,
            check: None,
            stdout: None,
            stderr: None,
            env: Vec::new(),
        }
    }

    #[test]
    fn cmd_run_empty_cmd_errors() {
        let runner = CommandRunner::with_host(FakeHost::new());
        let result = cmd_run(&runner, inputs(&[]), &RunDefaults::default());
        assert!(result.is_err());
        assert!(runner.host().spawns().is_empty());
    }

    #[test]
    fn cmd_run_layers_flags_over_config_env() {
        let runner = CommandRunner::with_host(
            FakeHost::new().with_environment(&[("HOME", "/home/foobar"), ("LANG", "C")]),
        );
        let mut defaults = RunDefaults::default();
        defaults.env.set("LANG", "en_GB.UTF-8");
        defaults.env.set("FOO", "config");

        let mut run = inputs(&["make", "install"]);
        run.env = vec!["FOO=flag".to_string()];
        cmd_run(&runner, run, &defaults).unwrap();

        let spawned = runner.host().spawns();
        assert_eq!(
            spawned[0].env,
            env_map(&[
                ("HOME", "/home/foobar"),
                ("LANG", "en_GB.UTF-8"),
                ("FOO", "flag"),
            ])
        );
    }

    #[test]
    fn cmd_run_uses_config_defaults_when_flags_absent() {
        let runner = CommandRunner::with_host(FakeHost::new());
        let defaults = RunDefaults {
            check: false,
            cwd: Some(PathBuf::from("/from/config")),
            stdout: Redirect::Capture,
            stderr: Redirect::Discard,
            env: EnvOverlay::new(),
        };

        let result = cmd_run(&runner, inputs(&["ls"]), &defaults).unwrap();
        let spawned = runner.host().spawns();
        assert_eq!(spawned[0].cwd, PathBuf::from("/from/config"));
        assert_eq!(spawned[0].stdout, Redirect::Capture);
        assert_eq!(spawned[0].stderr, Redirect::Discard);
        assert_eq!(result.stdout.as_deref(), Some(""));
        assert_eq!(result.stderr, None);
    }

    #[test]
    fn cmd_run_flags_override_config() {
        let runner = CommandRunner::with_host(FakeHost::new().with_exit_code(3));
        let defaults = RunDefaults {
            check: true,
            cwd: Some(PathBuf::from("/from/config")),
            stdout: Redirect::Capture,
            stderr: Redirect::Capture,
            env: EnvOverlay::new(),
        };

        let mut run = inputs(&["ls"]);
        run.check = Some(false);
        run.cwd = Some(PathBuf::from("/from/flag"));
        run.stdout = Some(Redirect::Inherit);
        let result = cmd_run(&runner, run, &defaults).unwrap();

        assert_eq!(result.code, 3);
        let spawned = runner.host().spawns();
        assert_eq!(spawned[0].cwd, PathBuf::from("/from/flag"));
        assert_eq!(spawned[0].stdout, Redirect::Inherit);
        assert_eq!(spawned[0].stderr, Redirect::Capture);
    }

    #[test]
    fn cmd_run_default_cwd_is_callers() {
        let runner = CommandRunner::with_host(FakeHost::new());
        cmd_run(&runner, inputs(&["ls"]), &RunDefaults::default()).unwrap();
        assert_eq!(runner.host().spawns()[0].cwd, PathBuf::from(FAKE_CWD));
    }

    #[test]
    fn cmd_run_check_failure_is_command_failed() {
        let runner = CommandRunner::with_host(FakeHost::new().with_exit_code(1));
        let mut run = inputs(&["/usr/bin/env", "false"]);
        run.check = Some(true);

        let err = cmd_run(&runner, run, &RunDefaults::default()).unwrap_err();
        let shell_err = err.downcast_ref::<ShellError>().unwrap();
        assert_eq!(shell_err.code(), Some(1));
    }

    #[test]
    fn cmd_run_rejects_bad_env_pair() {
        let runner = CommandRunner::with_host(FakeHost::new());
        let mut run = inputs(&["ls"]);
        run.env = vec!["NOEQUALS".to_string()];
        assert!(cmd_run(&runner, run, &RunDefaults::default()).is_err());
        assert!(runner.host().spawns().is_empty());
    }

    #[test]
    fn format_run_human_strips_trailing_newline() {
        let result = RunResult {
            argv: vec!["echo".to_string()],
            code: 0,
            stdout: Some("hello\n".to_string()),
            stderr: None,
        };
        assert_eq!(format_run_human(&result), "hello");
    }

    #[test]
    fn format_run_human_empty_when_not_captured() {
        let result = RunResult {
            argv: vec!["echo".to_string()],
            code: 0,
            stdout: None,
            stderr: None,
        };
        assert_eq!(format_run_human(&result), "");
    }
}
