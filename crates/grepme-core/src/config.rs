//! grepme settings: `config.toml` layered under `GREPME__*` environment variables.

use std::path::Path;

use anyhow::Result;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use log::LevelFilter;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::paths::{expand_str_path, write_default_config};
use crate::{AppPaths, env_prefix};

/// Default GroupMe API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.groupme.com/v3";

/// Largest page the GroupMe API will return in one request.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Everything read from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(title = "grepme settings", description = "Settings file for grepme")]
pub struct AppConfig {
    /// Editor hint pointing at the published schema.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub schema: Option<String>,

    /// Diagnostics.
    pub logging: LoggingConfig,

    /// GroupMe API access.
    pub api: ApiConfig,

    /// Search defaults.
    pub search: SearchConfig,

    /// On-disk cache of older message pages.
    pub cache: CacheConfig,

    /// Where token and cached pages live when the XDG defaults don't suit.
    pub paths: PathsConfig,
}

fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
    Ok(builder
        .set_default("logging.level", LogLevel::default().as_str())?
        .set_default("api.base_url", DEFAULT_API_BASE_URL)?
        .set_default("api.page_size", i64::from(MAX_PAGE_SIZE))?
        .set_default("api.timeout", DEFAULT_TIMEOUT_SECS)?)
}

impl AppConfig {
    /// Read `config.toml` from the discovered location, writing the commented
    /// default there first on a fresh install.
    ///
    /// # Errors
    ///
    /// Fails when the default file cannot be written or the settings don't parse.
    pub fn load(paths: &AppPaths) -> Result<Self> {
        if !paths.config_file.exists() {
            write_default_config(&paths.config_file)?;
        }
        Self::load_from_path(&paths.config_file)
    }

    /// Read settings from `config_file` if it exists, then apply `GREPME__*`
    /// overrides. A missing file means all defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file or an override has the wrong shape.
    pub fn load_from_path(config_file: &Path) -> Result<Self> {
        let source = File::from(config_file)
            .format(FileFormat::Toml)
            .required(false);
        let overrides = Environment::with_prefix(&env_prefix()).separator("__");

        let mut settings: Self = with_defaults(Config::builder())?
            .add_source(source)
            .add_source(overrides)
            .build()?
            .try_deserialize()?;
        settings.normalize()?;
        Ok(settings)
    }

    fn normalize(&mut self) -> Result<()> {
        if let Some(file) = self.logging.file.take() {
            self.logging.file = Some(expand_str_path(&file)?.display().to_string());
        }
        self.api.page_size = self.api.page_size.clamp(1, MAX_PAGE_SIZE);
        let trimmed = self.api.base_url.trim_end_matches('/').len();
        self.api.base_url.truncate(trimmed);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: None,
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// The `[logging]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Diagnostics written to stderr or a file")]
pub struct LoggingConfig {
    /// Verbosity used when no `-v`, `--debug` or `--trace` flag is given.
    #[schemars(default = "default_log_level")]
    pub level: LogLevel,

    /// Send diagnostics to this file instead of stderr. `~` and `$VARS` expand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

const fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

/// Verbosity names accepted in `logging.level`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Failures only.
    Error,
    /// Failures plus skipped patterns and cache trouble.
    #[default]
    Warn,
    /// Conversations as they are searched.
    Info,
    /// Every API request.
    Debug,
    /// Cursor movement inside the paginator.
    Trace,
}

impl LogLevel {
    /// The name used in `config.toml`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Matching filter for the `log` facade.
    #[must_use]
    pub const fn filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// GroupMe API configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "GroupMe API access")]
pub struct ApiConfig {
    /// Base URL of the v3 REST API.
    pub base_url: String,

    /// Messages or conversations requested per page (1-100).
    #[schemars(range(min = 1, max = 100))]
    pub page_size: u32,

    /// Request timeout in seconds.
    #[schemars(range(min = 1))]
    pub timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Search defaults applied when flags are omitted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Search defaults")]
pub struct SearchConfig {
    /// Conversation name patterns searched when no `--group` is given.
    pub default_groups: Vec<String>,

    /// Whether direct messages are searched alongside group chats.
    pub include_direct_messages: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_groups: vec!["ACM".to_string()],
            include_direct_messages: true,
        }
    }
}

/// The `[cache]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Response cache behavior")]
pub struct CacheConfig {
    /// Cache historical message pages on disk.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// The `[paths]` table.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Overrides for the data and cache directories")]
pub struct PathsConfig {
    /// Directory for persistent data. Supports ~ and environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Directory for cached API responses. Supports ~ and environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
}
