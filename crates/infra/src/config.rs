//! Engine configuration loaded from the environment.
//!
//! Unparsable values fall back to their defaults with a warning; only
//! contradictory settings are errors.

use sqlx::PgPool;
use thiserror::Error;

use finscope_analytics::MetricsPolicy;

use crate::event_store::query::{Pagination, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

pub const DATABASE_URL: &str = "FINSCOPE_DATABASE_URL";
pub const QUERY_DEFAULT_LIMIT: &str = "FINSCOPE_QUERY_DEFAULT_LIMIT";
pub const QUERY_MAX_LIMIT: &str = "FINSCOPE_QUERY_MAX_LIMIT";
pub const RUNWAY_SENTINEL_MONTHS: &str = "FINSCOPE_RUNWAY_SENTINEL_MONTHS";
pub const FREEDOM_HORIZON_MONTHS: &str = "FINSCOPE_FREEDOM_HORIZON_MONTHS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to connect to postgres: {0}")]
    Connect(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// `None` means in-memory stores.
    pub database_url: Option<String>,
    pub query_default_limit: u32,
    pub query_max_limit: u32,
    pub metrics: MetricsPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            query_default_limit: DEFAULT_PAGE_LIMIT,
            query_max_limit: MAX_PAGE_LIMIT,
            metrics: MetricsPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup(DATABASE_URL).filter(|url| !url.trim().is_empty());
        if database_url.is_none() {
            tracing::info!("{DATABASE_URL} not set; using in-memory stores");
        }

        let config = Self {
            database_url,
            query_default_limit: parsed(&lookup, QUERY_DEFAULT_LIMIT, defaults.query_default_limit),
            query_max_limit: parsed(&lookup, QUERY_MAX_LIMIT, defaults.query_max_limit),
            metrics: MetricsPolicy {
                runway_sentinel_months: parsed(
                    &lookup,
                    RUNWAY_SENTINEL_MONTHS,
                    defaults.metrics.runway_sentinel_months,
                ),
                freedom_horizon_months: parsed(
                    &lookup,
                    FREEDOM_HORIZON_MONTHS,
                    defaults.metrics.freedom_horizon_months,
                ),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_max_limit == 0 {
            return Err(ConfigError::Invalid(format!("{QUERY_MAX_LIMIT} must be positive")));
        }
        if self.query_default_limit > self.query_max_limit {
            return Err(ConfigError::Invalid(format!(
                "{QUERY_DEFAULT_LIMIT} ({}) exceeds {QUERY_MAX_LIMIT} ({})",
                self.query_default_limit, self.query_max_limit
            )));
        }
        if self.metrics.freedom_horizon_months <= 0.0 {
            return Err(ConfigError::Invalid(format!("{FREEDOM_HORIZON_MONTHS} must be positive")));
        }
        Ok(())
    }

    /// Page request bounded by the configured default and cap.
    pub fn pagination(&self, limit: Option<u32>, offset: Option<u32>) -> Pagination {
        Pagination::bounded(limit, offset, self.query_default_limit, self.query_max_limit)
    }

    /// Connect when a database URL is configured.
    pub async fn connect_pool(&self) -> Result<Option<PgPool>, ConfigError> {
        match &self.database_url {
            Some(url) => Ok(Some(PgPool::connect(url).await?)),
            None => Ok(None),
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "invalid value; using default");
            default
        }),
    }
}
