use std::path::{Path, PathBuf};

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    match (s, home_dir()) {
        ("~", Some(home)) => home,
        (s, Some(home)) if s.starts_with("~/") => home.join(&s[2..]),
        _ => path.to_path_buf(),
    }
}

/// Working directory for a child: the flag wins, then the config default,
/// otherwise `None` so the runner falls back to the caller's cwd.
pub fn pick_cwd(flag: Option<&Path>, configured: Option<&Path>) -> Option<PathBuf> {
    flag.or(configured).map(expand_tilde)
}
