use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// A full environment mapping as handed to a child process.
pub type EnvMap = BTreeMap<OsString, OsString>;

/// Variables that take precedence over the inherited environment for one
/// child invocation. Keys are unique; later writes replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &OsStr> {
        self.vars.keys().map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    /// Layer `other` on top of `self`; keys in `other` win.
    pub fn extend(&mut self, other: &EnvOverlay) {
        for (k, v) in &other.vars {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    /// Parse `KEY=VALUE` strings as given on the command line.
    pub fn parse_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut overlay = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((key, value)) => {
                    validate_key(key)?;
                    overlay.set(key, value);
                }
                None => bail!(
                    "invalid --env format: {:?}\n  hint: use --env NAME=value",
                    pair
                ),
            }
        }
        Ok(overlay)
    }
}

impl<K, V> FromIterator<(K, V)> for EnvOverlay
where
    K: Into<OsString>,
    V: Into<OsString>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut overlay = Self::new();
        for (k, v) in iter {
            overlay.set(k, v);
        }
        overlay
    }
}

pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        bail!("environment variable name must not be empty");
    }
    if key.contains('=') || key.contains('\0') {
        bail!("invalid environment variable name: {:?}", key);
    }
    Ok(())
}

/// Snapshot of the calling process's environment. Read only; never written back.
pub fn snapshot() -> EnvMap {
    std::env::vars_os().collect()
}

/// Copy `base` and set every overlay key on the copy.
pub fn merge(base: &EnvMap, overlay: &EnvOverlay) -> EnvMap {
    let mut merged = base.clone();
    for (k, v) in overlay.iter() {
        merged.insert(k.to_os_string(), v.to_os_string());
    }
    merged
}
