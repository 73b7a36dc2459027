use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Backend URL must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("Cache TTL cannot be 0: {0}")]
    ZeroTtl(&'static str),

    #[error("Backend timeout cannot be 0")]
    ZeroTimeout,

    #[error("Cascade min_results must be at least 1")]
    ZeroMinResults,

    #[error("Backend max_retries cannot exceed 10, got {0}")]
    TooManyRetries(u32),
}

/// Upper bound for `backend.max_retries`; the backoff doubles on every retry.
pub const MAX_RETRIES: u32 = 10;

/// Network listener configuration
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

/// Event-data backend
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the API, e.g. `https://api.esdeveniments.cat/api`
    pub url: Url,
    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries on 429 and 5xx before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay, doubled on every retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl BackendConfig {
    pub fn new(url: Url) -> Self {
        BackendConfig {
            url,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.url.scheme() {
            "http" | "https" => {}
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }
        if self.timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        if self.max_retries > MAX_RETRIES {
            return Err(ValidationError::TooManyRetries(self.max_retries));
        }
        Ok(())
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Place list, category list and region lookups
    pub places_ttl_secs: u64,
    /// Event and news details
    pub detail_ttl_secs: u64,
    /// Slugs known to be neither canonical nor an alias
    pub unknown_slug_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            places_ttl_secs: 3600,
            detail_ttl_secs: 600,
            unknown_slug_ttl_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn places_ttl(&self) -> Duration {
        Duration::from_secs(self.places_ttl_secs)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }

    pub fn unknown_slug_ttl(&self) -> Duration {
        Duration::from_secs(self.unknown_slug_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.places_ttl_secs == 0 {
            return Err(ValidationError::ZeroTtl("places_ttl_secs"));
        }
        if self.detail_ttl_secs == 0 {
            return Err(ValidationError::ZeroTtl("detail_ttl_secs"));
        }
        if self.unknown_slug_ttl_secs == 0 {
            return Err(ValidationError::ZeroTtl("unknown_slug_ttl_secs"));
        }
        Ok(())
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct CascadeConfig {
    /// Results a tier needs before the cascade stops relaxing the filter
    pub min_results: usize,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        CascadeConfig { min_results: 1 }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub cascade: CascadeConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.backend.validate()?;
        self.cache.validate()?;
        if self.cascade.min_results == 0 {
            return Err(ValidationError::ZeroMinResults);
        }
        Ok(())
    }
}
