//! Client configuration, read from the environment.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_GRAPHQL_URL: &str = "http://localhost:4000/graphql";

/// Header injected on every GraphQL request in development builds only.
pub const DEV_ENV_HEADER: &str = "x-careerhub-env";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
        }
    }
}

impl core::fmt::Display for AppEnv {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("refresh interval ({interval:?}) must be non-zero and shorter than the token lifetime ({lifetime:?})")]
    RefreshWindow { interval: Duration, lifetime: Duration },
}

/// Timing policy for the refresh scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub refresh_interval: Duration,
    pub refresh_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(240),
            refresh_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub graphql_url: String,
    pub env: AppEnv,
    /// Period of the background refresh; must stay below `token_lifetime`.
    pub refresh_interval: Duration,
    pub token_lifetime: Duration,
    pub refresh_timeout: Duration,
    pub request_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            env: AppEnv::Development,
            refresh_interval: Duration::from_secs(240),
            token_lifetime: Duration::from_secs(300),
            refresh_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(15),
            idle_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Load from `CAREERHUB_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let graphql_url = lookup("CAREERHUB_GRAPHQL_URL").unwrap_or_else(|| {
            tracing::warn!("CAREERHUB_GRAPHQL_URL not set; using {DEFAULT_GRAPHQL_URL}");
            defaults.graphql_url.clone()
        });

        let env = match lookup("CAREERHUB_ENV").as_deref().map(str::trim) {
            None | Some("") | Some("development") | Some("dev") => AppEnv::Development,
            Some("production") | Some("prod") => AppEnv::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "CAREERHUB_ENV",
                    value: other.to_string(),
                });
            }
        };

        let secs = |var: &'static str| -> Result<Option<Duration>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(|s| Some(Duration::from_secs(s)))
                    .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
            }
        };

        let config = Self {
            graphql_url,
            env,
            refresh_interval: secs("CAREERHUB_REFRESH_INTERVAL_SECS")?.unwrap_or(defaults.refresh_interval),
            token_lifetime: secs("CAREERHUB_TOKEN_LIFETIME_SECS")?.unwrap_or(defaults.token_lifetime),
            refresh_timeout: secs("CAREERHUB_REFRESH_TIMEOUT_SECS")?.unwrap_or(defaults.refresh_timeout),
            request_timeout: secs("CAREERHUB_REQUEST_TIMEOUT_SECS")?.unwrap_or(defaults.request_timeout),
            idle_timeout: secs("CAREERHUB_IDLE_TIMEOUT_SECS")?.filter(|d| !d.is_zero()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval.is_zero() || self.refresh_interval >= self.token_lifetime {
            return Err(ConfigError::RefreshWindow {
                interval: self.refresh_interval,
                lifetime: self.token_lifetime,
            });
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            refresh_interval: self.refresh_interval,
            refresh_timeout: self.refresh_timeout,
        }
    }
}
