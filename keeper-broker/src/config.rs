use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

pub const ENV_BIND_ADDRESS: &str = "KEEPER_BIND_ADDRESS";
pub const ENV_SECRET_KEY: &str = "KEEPER_SECRET_KEY";
pub const ENV_QUERY_TIMEOUT_MS: &str = "KEEPER_QUERY_TIMEOUT_MS";
pub const ENV_TOKEN_TTL_SECS: &str = "KEEPER_TOKEN_TTL_SECS";
pub const ENV_STATE_PATH: &str = "KEEPER_STATE_PATH";

/// Broker settings, resolved from defaults, an optional file, the environment
/// and command line overrides, in that order.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub bind_address: SocketAddr,
    pub secret_key: Option<String>,
    pub query_timeout_ms: u64,
    pub token_ttl_secs: u64,
    pub state_path: Option<PathBuf>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            secret_key: None,
            query_timeout_ms: 5_000,
            token_ttl_secs: 24 * 60 * 60,
            state_path: None,
        }
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("bind_address", &self.bind_address)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("query_timeout_ms", &self.query_timeout_ms)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("state_path", &self.state_path)
            .finish()
    }
}

/// Values given on the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub state_path: Option<PathBuf>,
}

impl BrokerConfig {
    /// Resolves every layer from the process environment and validates the result.
    pub fn resolve(file: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        Self::resolve_with(file, cli, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(file: Option<&Path>, cli: &CliOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, or JSON when the extension is `.json`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse json config {}", path.display()))
        } else {
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse toml config {}", path.display()))
        }
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BIND_ADDRESS) {
            self.bind_address = value
                .parse()
                .with_context(|| format!("{ENV_BIND_ADDRESS} is not a socket address"))?;
        }
        if let Some(value) = lookup(ENV_SECRET_KEY) {
            self.secret_key = Some(value);
        }
        if let Some(value) = lookup(ENV_QUERY_TIMEOUT_MS) {
            self.query_timeout_ms = value
                .parse()
                .with_context(|| format!("{ENV_QUERY_TIMEOUT_MS} must be an integer"))?;
        }
        if let Some(value) = lookup(ENV_TOKEN_TTL_SECS) {
            self.token_ttl_secs = value
                .parse()
                .with_context(|| format!("{ENV_TOKEN_TTL_SECS} must be an integer"))?;
        }
        if let Some(value) = lookup(ENV_STATE_PATH).filter(|value| !value.is_empty()) {
            self.state_path = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(bind) = cli.bind {
            self.bind_address = bind;
        }
        if let Some(path) = &cli.state_path {
            self.state_path = Some(path.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.secret_key.as_deref().is_none_or(str::is_empty) {
            bail!("a non-empty server secret is required (set {ENV_SECRET_KEY})");
        }
        if self.query_timeout_ms == 0 {
            bail!("query_timeout_ms must be positive");
        }
        if self.token_ttl_secs == 0 {
            bail!("token_ttl_secs must be positive");
        }
        Ok(())
    }

    pub fn secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("server secret is not configured"))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}
