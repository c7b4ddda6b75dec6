//! Where grepme keeps its settings, token and cached pages.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::schema::generate_example_config;
use crate::{APP_NAME, AppConfig};

const CONFIG_FILE: &str = "config.toml";
const CREDENTIALS_FILE: &str = "credentials.json";
const RESPONSES_DIR: &str = "responses";

/// Resolved on-disk locations.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// The `config.toml` in use.
    pub config_file: PathBuf,
    /// Holds the stored access token.
    pub data_dir: PathBuf,
    /// Holds the response cache. Safe to delete at any time.
    pub cache_dir: PathBuf,
}

impl AppPaths {
    /// Resolve XDG locations. `--config` may name either a file or a
    /// directory containing `config.toml`.
    ///
    /// # Errors
    ///
    /// Fails when no home directory can be found or `--config` does not expand.
    pub fn discover(config_flag: Option<&Path>) -> Result<Self> {
        let config_file = config_flag
            .map(expand_path)
            .transpose()?
            .map(|given| if given.is_dir() { given.join(CONFIG_FILE) } else { given });
        let config_file = match config_file {
            Some(file) => file,
            None => BaseDir::Config.resolve()?.join(CONFIG_FILE),
        };
        if config_file.file_name().is_none() {
            return Err(anyhow!("{} does not name a config file", config_file.display()));
        }

        Ok(Self {
            config_file,
            data_dir: BaseDir::Data.resolve()?,
            cache_dir: BaseDir::Cache.resolve()?,
        })
    }

    /// Swap in the `[paths]` directories from the settings file, when set.
    ///
    /// # Errors
    ///
    /// Fails when an override does not expand.
    pub fn apply_overrides(self, cfg: &AppConfig) -> Result<Self> {
        let pick = |configured: Option<&String>, fallback: PathBuf| {
            configured.map_or(Ok(fallback), |dir| expand_str_path(dir))
        };
        Ok(Self {
            data_dir: pick(cfg.paths.data_dir.as_ref(), self.data_dir)?,
            cache_dir: pick(cfg.paths.cache_dir.as_ref(), self.cache_dir)?,
            config_file: self.config_file,
        })
    }

    /// Create the data directory. The cache directory is left to the
    /// response cache so `--clear-cache` can remove it wholesale.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("cannot create {}", self.data_dir.display()))
    }

    /// Location of the stored access token.
    #[must_use]
    pub fn credentials_file(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE)
    }

    /// Directory holding cached API responses.
    #[must_use]
    pub fn responses_dir(&self) -> PathBuf {
        self.cache_dir.join(RESPONSES_DIR)
    }
}

impl std::fmt::Display for AppPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { config_file, data_dir, cache_dir } = self;
        write!(
            f,
            "config={} data={} cache={}",
            config_file.display(),
            data_dir.display(),
            cache_dir.display()
        )
    }
}

/// [`expand_str_path`] for paths that are valid UTF-8. Anything else is
/// returned untouched.
///
/// # Errors
///
/// Fails on an undefined variable or an unknown home directory.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    match path.to_str() {
        Some(text) => expand_str_path(text),
        None => Ok(path.to_owned()),
    }
}

/// Expand `~` and `$VARS` in a user-supplied path.
///
/// # Errors
///
/// Fails on an undefined variable or an unknown home directory.
pub fn expand_str_path(text: &str) -> Result<PathBuf> {
    shellexpand::full(text)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .with_context(|| format!("cannot expand {text}"))
}

/// The three XDG base directories grepme uses.
#[derive(Debug, Clone, Copy)]
enum BaseDir {
    Config,
    Data,
    Cache,
}

impl BaseDir {
    const fn env_var(self) -> &'static str {
        match self {
            Self::Config => "XDG_CONFIG_HOME",
            Self::Data => "XDG_DATA_HOME",
            Self::Cache => "XDG_CACHE_HOME",
        }
    }

    fn platform_dir(self) -> Option<PathBuf> {
        match self {
            Self::Config => dirs::config_dir(),
            Self::Data => dirs::data_dir(),
            Self::Cache => dirs::cache_dir(),
        }
    }

    const fn home_relative(self) -> &'static str {
        match self {
            Self::Config => ".config",
            Self::Data => ".local/share",
            Self::Cache => ".cache",
        }
    }

    /// `$XDG_*_HOME/grepme`, else the platform directory, else a path under
    /// the home directory.
    fn resolve(self) -> Result<PathBuf> {
        let base = env::var_os(self.env_var())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.platform_dir())
            .or_else(|| dirs::home_dir().map(|home| home.join(self.home_relative())))
            .ok_or_else(|| anyhow!("unable to determine ${} or a home directory", self.env_var()))?;
        Ok(base.join(APP_NAME))
    }
}

/// Write the commented default `config.toml` to `path`.
///
/// # Errors
///
/// Fails when the file or its parent directory cannot be created.
pub fn write_default_config(path: &Path) -> Result<()> {
    let contents = generate_example_config(APP_NAME)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_data_and_cache_dirs() {
        let paths = AppPaths {
            config_file: PathBuf::from("/etc/grepme/config.toml"),
            data_dir: PathBuf::from("/var/lib/grepme"),
            cache_dir: PathBuf::from("/var/cache/grepme"),
        };
        let mut cfg = AppConfig::default();
        cfg.paths.cache_dir = Some("/tmp/grepme-cache".to_string());

        let paths = paths.apply_overrides(&cfg).expect("overrides");
        assert_eq!(paths.data_dir, PathBuf::from("/var/lib/grepme"));
        assert_eq!(paths.cache_dir, PathBuf::from("/tmp/grepme-cache"));
        assert_eq!(
            paths.responses_dir(),
            PathBuf::from("/tmp/grepme-cache/responses")
        );
        assert_eq!(
            paths.credentials_file(),
            PathBuf::from("/var/lib/grepme/credentials.json")
        );
    }

    #[test]
    fn default_config_round_trips_through_loader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        write_default_config(&path).expect("write default config");

        let loaded = AppConfig::load_from_path(&path).expect("load written config");
        assert_eq!(loaded.search.default_groups, vec!["ACM".to_string()]);
        assert_eq!(loaded.api.page_size, 100);
    }
}
