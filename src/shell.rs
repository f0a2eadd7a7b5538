//! Synchronous external-command helpers: version-control identity lookup and
//! single-shot command execution with an environment overlay.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::debug;

use crate::env::{self, EnvMap, EnvOverlay};

pub const GIT: &str = "git";
pub const DEFAULT_AUTHOR: &str = "John Doe";
pub const DEFAULT_EMAIL: &str = "example@email.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub author: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            email: DEFAULT_EMAIL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Redirect {
    /// Pass through to the caller's own stream.
    #[default]
    Inherit,
    /// Send to the null device.
    Discard,
    /// Buffer and return in [`CompletedProcess`].
    Capture,
}

impl std::str::FromStr for Redirect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inherit" => Ok(Redirect::Inherit),
            "discard" | "null" => Ok(Redirect::Discard),
            "capture" => Ok(Redirect::Capture),
            other => Err(format!(
                "unknown stream mode {:?} (expected inherit, discard or capture)",
                other
            )),
        }
    }
}

impl Redirect {
    fn to_stdio(self) -> Stdio {
        match self {
            Redirect::Inherit => Stdio::inherit(),
            Redirect::Discard => Stdio::null(),
            Redirect::Capture => Stdio::piped(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("command {argv:?} returned non-zero exit status {code}")]
    CommandFailed { code: i32, argv: Vec<String> },

    #[error(transparent)]
    Spawn(#[from] io::Error),
}

impl ShellError {
    pub fn code(&self) -> Option<i32> {
        match self {
            ShellError::CommandFailed { code, .. } => Some(*code),
            ShellError::Spawn(_) => None,
        }
    }
}

/// What to run and how. The argument vector is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    check: bool,
    stdout: Redirect,
    stderr: Redirect,
    env: EnvOverlay,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            cwd: None,
            check: false,
            stdout: Redirect::Inherit,
            stderr: Redirect::Inherit,
            env: EnvOverlay::new(),
        }
    }

    /// Returns `None` for an empty argument vector.
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = argv.into_iter();
        let program = iter.next()?;
        Some(Self::new(program).args(iter))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn stdout(mut self, redirect: Redirect) -> Self {
        self.stdout = redirect;
        self
    }

    pub fn stderr(mut self, redirect: Redirect) -> Self {
        self.stderr = redirect;
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.set(key, value);
        self
    }

    pub fn envs(mut self, overlay: &EnvOverlay) -> Self {
        self.env.extend(overlay);
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn overlay(&self) -> &EnvOverlay {
        &self.env
    }

    pub fn is_checked(&self) -> bool {
        self.check
    }
}

/// A fully resolved spawn request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub env: EnvMap,
    pub stdout: Redirect,
    pub stderr: Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedProcess {
    pub argv: Vec<String>,
    pub code: i32,
    /// `Some` only when the stream was captured.
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
}

impl CompletedProcess {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_str(&self) -> Option<String> {
        self.stdout
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn stderr_str(&self) -> Option<String> {
        self.stderr
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// Operating-system facilities the runner depends on.
pub trait ProcessHost {
    /// Whether `program` resolves via the command search path.
    fn resolvable(&self, program: &str) -> bool;

    fn environment(&self) -> EnvMap;

    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Run `argv` with inherited environment and working directory,
    /// capturing stdout.
    fn capture_stdout(&self, argv: &[&str]) -> io::Result<CompletedProcess>;

    /// Spawn and wait for termination.
    fn spawn(&self, invocation: &Invocation) -> io::Result<CompletedProcess>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsHost;

impl ProcessHost for OsHost {
    fn resolvable(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn environment(&self) -> EnvMap {
        env::snapshot()
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn capture_stdout(&self, argv: &[&str]) -> io::Result<CompletedProcess> {
        let (program, args) = split_argv(argv)?;
        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()?;

        Ok(CompletedProcess {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            code: exit_code(output.status),
            stdout: Some(output.stdout),
            stderr: None,
        })
    }

    fn spawn(&self, invocation: &Invocation) -> io::Result<CompletedProcess> {
        let (program, args) = split_argv(&invocation.argv)?;
        let output = Command::new(program)
            .args(args)
            .current_dir(&invocation.cwd)
            .env_clear()
            .envs(&invocation.env)
            .stdin(Stdio::inherit())
            .stdout(invocation.stdout.to_stdio())
            .stderr(invocation.stderr.to_stdio())
            .output()?;

        Ok(CompletedProcess {
            argv: invocation.argv.clone(),
            code: exit_code(output.status),
            stdout: (invocation.stdout == Redirect::Capture).then_some(output.stdout),
            stderr: (invocation.stderr == Redirect::Capture).then_some(output.stderr),
        })
    }
}

fn split_argv<S: AsRef<str>>(argv: &[S]) -> io::Result<(&str, &[S])> {
    match argv.split_first() {
        Some((program, args)) => Ok((program.as_ref(), args)),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty argument vector",
        )),
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| -s))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[derive(Debug, Clone, Default)]
pub struct CommandRunner<H: ProcessHost = OsHost> {
    host: H,
}

impl CommandRunner<OsHost> {
    pub fn new() -> Self {
        Self { host: OsHost }
    }
}

impl<H: ProcessHost> CommandRunner<H> {
    pub fn with_host(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Configured git user name and email, or the default identity if git is
    /// missing or either lookup fails. Never a mix of real and default values.
    pub fn get_vcs_identity(&self) -> Identity {
        if !self.host.resolvable(GIT) {
            debug!("{} not found on search path, using default identity", GIT);
            return Identity::default();
        }

        let author = self.git_config("user.name");
        let email = self.git_config("user.email");

        match (author, email) {
            (Some(author), Some(email)) => Identity { author, email },
            _ => {
                debug!("git identity incomplete, using default identity");
                Identity::default()
            }
        }
    }

    fn git_config(&self, key: &str) -> Option<String> {
        let argv = [GIT, "config", "--get", key];
        let completed = match self.host.capture_stdout(&argv) {
            Ok(c) => c,
            Err(e) => {
                debug!(key, error = %e, "git config lookup could not run");
                return None;
            }
        };

        if !completed.success() {
            debug!(key, code = completed.code, "git config lookup failed");
            return None;
        }

        let bytes = completed.stdout.unwrap_or_default();
        match String::from_utf8(bytes) {
            Ok(value) => Some(value.trim().to_string()),
            Err(_) => {
                debug!(key, "git config value was not valid UTF-8");
                None
            }
        }
    }

    /// Run `spec` once and wait for it to exit.
    ///
    /// The child sees a copy of the current environment with the spec's
    /// overlay applied; the caller's environment is left untouched. With
    /// `check` set a non-zero exit becomes [`ShellError::CommandFailed`].
    /// Spawn failures pass through as [`ShellError::Spawn`].
    pub fn run_command(&self, spec: &CommandSpec) -> Result<CompletedProcess, ShellError> {
        let cwd = match &spec.cwd {
            Some(cwd) => cwd.clone(),
            None => self.host.current_dir()?,
        };
        let env = env::merge(&self.host.environment(), &spec.env);

        let invocation = Invocation {
            argv: spec.argv.clone(),
            cwd,
            env,
            stdout: spec.stdout,
            stderr: spec.stderr,
        };

        let overlay_keys: Vec<_> = spec.env.keys().collect();
        debug!(
            argv = ?invocation.argv,
            cwd = %invocation.cwd.display(),
            overlay = ?overlay_keys,
            "spawning command"
        );

        let completed = self.host.spawn(&invocation)?;

        if spec.check && !completed.success() {
            debug!(argv = ?completed.argv, code = completed.code, "command failed");
            return Err(ShellError::CommandFailed {
                code: completed.code,
                argv: completed.argv,
            });
        }

        Ok(completed)
    }
}

pub fn get_vcs_identity() -> Identity {
    CommandRunner::new().get_vcs_identity()
}

pub fn run_command(spec: &CommandSpec) -> Result<CompletedProcess, ShellError> {
    CommandRunner::new().run_command(spec)
}
