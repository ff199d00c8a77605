//! # Configuration Module
//!
//! Application configuration, passed explicitly into
//! [`Application::new`](crate::app::Application::new).
//!
//! ## Sources
//!
//! - **Files**: [`AppConfig::load`] reads TOML (`.toml`) or YAML (`.yaml` / `.yml`).
//! - **Layered files**: [`AppConfig::load_layered`] deep-merges several files, later files
//!   winning. Tables merge key by key; arrays and scalars are replaced whole.
//! - **Environment**: [`AppConfig::from_env`] reads the variables below on top of the
//!   defaults.
//!
//! ## Environment Variables
//!
//! ### `APP_ENV`
//!
//! One of `production`, `development`, `testing`, `staging`, `local`.
//! Default: `production`. Any other value is a [`ConfigError::InvalidEnvironment`].
//!
//! ### `APP_URL`
//!
//! Public base URL of the application. Default: `http://localhost`.
//!
//! ### `HYPERDRIVE_GLOBAL_MIDDLEWARE`
//!
//! Comma-separated middleware aliases run around every request, outermost first:
//!
//! ```bash
//! export HYPERDRIVE_GLOBAL_MIDDLEWARE=tracing,cors
//! ```
//!
//! ## Example File
//!
//! ```toml
//! [app]
//! name = "billing"
//! environment = "development"
//!
//! [middleware]
//! global = ["tracing", "cors"]
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```

use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors that are not I/O or syntax problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "invalid environment `{0}`: must be one of production, development, testing, staging, local"
    )]
    InvalidEnvironment(String),

    #[error("unsupported config file extension `{0}` (expected toml, yaml or yml)")]
    UnsupportedFormat(String),

    #[error("unknown global middleware `{0}`")]
    UnknownMiddleware(String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    #[default]
    Production,
    Development,
    Testing,
    Staging,
    Local,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Staging => "staging",
            Self::Local => "local",
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    /// `local`, `development` and `testing`: error details may be shown to clients.
    #[must_use]
    pub fn is_local(self) -> bool {
        matches!(self, Self::Local | Self::Development | Self::Testing)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            "testing" => Ok(Self::Testing),
            "staging" => Ok(Self::Staging),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(value: Environment) -> Self {
        value.as_str().to_string()
    }
}

/// `[app]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub url: String,
    pub environment: Environment,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "hyperdrive".to_string(),
            url: "http://localhost".to_string(),
            environment: Environment::default(),
        }
    }
}

/// `[middleware]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Aliases of middleware wrapped around every request, outermost first.
    pub global: Vec<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub middleware: MiddlewareConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Defaults with the given environment.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = Self::default();
        config.app.environment = environment;
        config
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.app.environment
    }

    /// Defaults overridden by `APP_ENV`, `APP_URL` and `HYPERDRIVE_GLOBAL_MIDDLEWARE`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEnvironment`] for an unknown `APP_ENV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) against an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEnvironment`] for an unknown `APP_ENV`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup("APP_ENV") {
            config.app.environment = value.parse()?;
        }
        if let Some(url) = lookup("APP_URL") {
            config.app.url = url;
        }
        if let Some(list) = lookup("HYPERDRIVE_GLOBAL_MIDDLEWARE") {
            config.middleware.global = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(config)
    }

    /// Load a TOML or YAML file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Read failures, parse failures, and [`ConfigError::UnsupportedFormat`].
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::parse(&text, extension)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load several TOML or YAML files and deep-merge them in order before deserializing.
    ///
    /// ```rust,ignore
    /// let config = AppConfig::load_layered(&["config/base.toml", "config/production.yaml"])?;
    /// ```
    ///
    /// An empty list gives the defaults.
    ///
    /// # Errors
    ///
    /// Any file that is missing or fails to parse, [`ConfigError::UnsupportedFormat`], and
    /// a merged document that does not fit the schema.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            let layer = parse_table(&text, extension)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            merge_tables(&mut merged, layer);
        }
        toml::Value::Table(merged)
            .try_into::<Self>()
            .context("building layered config")
    }

    /// Parse config text in the format named by `extension`.
    ///
    /// # Errors
    ///
    /// Parse failures, and [`ConfigError::UnsupportedFormat`].
    pub fn parse(text: &str, extension: &str) -> anyhow::Result<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "toml" => Ok(toml::from_str(text)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(text)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string()).into()),
        }
    }
}

fn parse_table(text: &str, extension: &str) -> anyhow::Result<toml::Table> {
    match extension.to_ascii_lowercase().as_str() {
        "toml" => Ok(toml::from_str(text)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(text)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string()).into()),
    }
}

/// Merge `layer` into `base`. Nested tables merge recursively; any other value replaces.
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
