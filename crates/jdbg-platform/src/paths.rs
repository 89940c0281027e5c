use std::path::{Path, PathBuf};

use crate::error::PlatformError;

/// Directory name used under every per-user location.
pub const APP_DIR_NAME: &str = "jdbg";

/// Where jdbg keeps its per-user files.
pub trait PlatformPaths: Send + Sync {
    /// Directory holding the global `config.toml`.
    fn config_dir(&self) -> PathBuf;
    /// Directory holding session logs.
    fn log_dir(&self) -> PathBuf;
}

/// XDG-style locations: `$XDG_CONFIG_HOME/jdbg` and `$XDG_STATE_HOME/jdbg/logs`,
/// falling back to `~/.config` and `~/.local/state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPaths {
    config_root: PathBuf,
    state_root: PathBuf,
}

impl DefaultPaths {
    /// Resolve from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Path` if the home directory cannot be
    /// determined.
    pub fn new() -> Result<Self, PlatformError> {
        let home = dirs::home_dir()
            .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
            .ok_or_else(|| PlatformError::Path("could not determine home directory".into()))?;
        Ok(Self::resolve(&home, |key| std::env::var(key).ok()))
    }

    /// Paths rooted at an explicit home directory, ignoring the environment.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        Self::resolve(home.as_ref(), |_| None)
    }

    /// Resolve against `home`, consulting `var` for XDG overrides. Relative
    /// XDG values are ignored, as the base directory spec requires.
    pub fn resolve(home: &Path, var: impl Fn(&str) -> Option<String>) -> Self {
        let root = |key: &str, fallback: &[&str]| {
            var(key)
                .map(PathBuf::from)
                .filter(|p| p.is_absolute())
                .unwrap_or_else(|| fallback.iter().fold(home.to_path_buf(), |p, c| p.join(c)))
        };
        Self {
            config_root: root("XDG_CONFIG_HOME", &[".config"]),
            state_root: root("XDG_STATE_HOME", &[".local", "state"]),
        }
    }
}

impl PlatformPaths for DefaultPaths {
    fn config_dir(&self) -> PathBuf {
        self.config_root.join(APP_DIR_NAME)
    }

    fn log_dir(&self) -> PathBuf {
        self.state_root.join(APP_DIR_NAME).join("logs")
    }
}
