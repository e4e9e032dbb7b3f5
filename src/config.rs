//! TOML configuration parsing and validation.
//!
//! A configuration file looks like:
//!
//! ```toml
//! [db]
//! path = "./data/foodcat.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [api]
//! default_limit = 20
//! default_top = 10
//! param_policy = "lenient"
//!
//! [client]
//! api_base = "http://127.0.0.1:5000"
//! page_size = 10
//!
//! [fetch]
//! base_url = "https://world.openfoodfacts.org"
//! timeout_secs = 12
//! retries = 3
//! delay_ms = 500
//! backoff_ms = 600
//! ```
//!
//! Only `[db]` and `[server]` are required. `FOODCAT_DB_PATH` and
//! `FOODCAT_BIND` override the file values when set.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::query::ParamPolicy;

pub const DB_PATH_ENV: &str = "FOODCAT_DB_PATH";
pub const BIND_ENV: &str = "FOODCAT_BIND";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Defaults applied by the Query Service to missing request parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_top")]
    pub default_top: i64,
    #[serde(default)]
    pub param_policy: ParamPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_top: default_top(),
            param_policy: ParamPolicy::default(),
        }
    }
}

fn default_limit() -> i64 {
    20
}
fn default_top() -> i64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            page_size: default_page_size(),
        }
    }
}

fn default_api_base() -> String {
    "http://127.0.0.1:5000".to_string()
}
fn default_page_size() -> i64 {
    10
}

/// Remote product source used by `foodcat fetch`.
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_base")]
    pub base_url: String,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Extra attempts after the first failed request.
    #[serde(default = "default_fetch_retries")]
    pub retries: u32,
    /// Pause between products.
    #[serde(default = "default_fetch_delay")]
    pub delay_ms: u64,
    /// Retry wait grows linearly: `backoff_ms * attempt`.
    #[serde(default = "default_fetch_backoff")]
    pub backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_fetch_base(),
            timeout_secs: default_fetch_timeout(),
            retries: default_fetch_retries(),
            delay_ms: default_fetch_delay(),
            backoff_ms: default_fetch_backoff(),
        }
    }
}

fn default_fetch_base() -> String {
    "https://world.openfoodfacts.org".to_string()
}
fn default_fetch_timeout() -> u64 {
    12
}
fn default_fetch_retries() -> u32 {
    3
}
fn default_fetch_delay() -> u64 {
    500
}
fn default_fetch_backoff() -> u64 {
    600
}

impl Config {
    /// Configuration used when no file is available, e.g. for `foodcat browse`
    /// against a remote server.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/foodcat.sqlite"),
            },
            server: ServerConfig {
                bind: "127.0.0.1:5000".to_string(),
            },
            api: ApiConfig::default(),
            client: ClientConfig::default(),
            fetch: FetchConfig::default(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            info!("{DB_PATH_ENV} set, using database at {path}");
            self.db.path = PathBuf::from(path);
        }
        if let Ok(bind) = std::env::var(BIND_ENV) {
            info!("{BIND_ENV} set, binding to {bind}");
            self.server.bind = bind;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api.default_limit < 1 {
            bail!("api.default_limit must be >= 1");
        }
        if self.api.default_top < 1 {
            bail!("api.default_top must be >= 1");
        }
        if self.client.page_size < 1 {
            bail!("client.page_size must be >= 1");
        }
        if self.server.bind.trim().is_empty() {
            bail!("server.bind must not be empty");
        }
        if !self.client.api_base.starts_with("http://")
            && !self.client.api_base.starts_with("https://")
        {
            bail!(
                "client.api_base must be an http(s) URL, got '{}'",
                self.client.api_base
            );
        }
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be >= 1");
        }
        if !self.fetch.base_url.starts_with("http://")
            && !self.fetch.base_url.starts_with("https://")
        {
            bail!(
                "fetch.base_url must be an http(s) URL, got '{}'",
                self.fetch.base_url
            );
        }
        Ok(())
    }
}

/// Parse a configuration document, apply environment overrides and validate.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    debug!("Loaded config from {}", path.display());

    parse_config(&content)
}
