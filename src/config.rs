use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::env::{validate_key, EnvOverlay};
use crate::paths::expand_tilde;
use crate::shell::Redirect;

pub const CONFIG_ENV_VAR: &str = "SHELLKIT_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub check: bool,
    pub cwd: Option<PathBuf>,
    pub stdout: Redirect,
    pub stderr: Redirect,
    pub env: BTreeMap<String, String>,
}

/// Defaults for `shellkit run`, after validation and tilde expansion.
#[derive(Debug, Clone, Default)]
pub struct RunDefaults {
    pub check: bool,
    pub cwd: Option<PathBuf>,
    pub stdout: Redirect,
    pub stderr: Redirect,
    pub env: EnvOverlay,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub run: RunDefaults,
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", "shellkit")
        .context("could not determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// `--config` flag, then `$SHELLKIT_CONFIG`, then the platform default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path));
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Ok(expand_tilde(Path::new(&path)));
    }
    default_config_path()
}

/// A missing file is not an error; built-in defaults apply.
pub fn load_config(path: &Path) -> Result<ResolvedConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(ResolvedConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<ResolvedConfig> {
    let raw: Config = toml::from_str(contents).context("failed to parse config TOML")?;

    let mut env = EnvOverlay::new();
    for (key, value) in &raw.run.env {
        validate_key(key).context("invalid key in [run.env]")?;
        env.set(key, value);
    }

    Ok(ResolvedConfig {
        run: RunDefaults {
            check: raw.run.check,
            cwd: raw.run.cwd.as_deref().map(expand_tilde),
            stdout: raw.run.stdout,
            stderr: raw.run.stderr,
            env,
        },
    })
}
