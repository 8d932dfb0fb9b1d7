//! Configuration Module
//!
//! Handles loading, validating and managing proxy configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ProxyError, Result};

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. Values that are present but invalid are rejected rather than
/// silently replaced by a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host of the backing Redis instance
    pub backend_host: String,
    /// Port of the backing Redis instance
    pub backend_port: u16,
    /// Host the client listener binds to
    pub listen_host: String,
    /// Port the client listener binds to
    pub listen_port: u16,
    /// Maximum number of keys held in the cache
    pub cache_capacity: usize,
    /// Lifetime of a cache entry in seconds (fractional allowed)
    pub cache_ttl_secs: f64,
    /// Timeout for one backend round trip in seconds
    pub backend_timeout_secs: f64,
    /// Number of pooled backend connections
    pub backend_pool_size: usize,
    /// Longest client line accepted, in bytes
    pub max_line_length: usize,
    /// Port for the admin HTTP surface, disabled when None
    pub admin_port: Option<u16>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `BACKEND_HOST` / `BACKEND_PORT` - Backing Redis (default: 127.0.0.1:6379)
    /// - `LISTEN_HOST` / `LISTEN_PORT` - Client listener (default: 127.0.0.1:5555)
    /// - `CACHE_CAPACITY` - Maximum cached keys (default: 1000)
    /// - `CACHE_TTL_SECS` - Entry lifetime in seconds (default: 7200)
    /// - `BACKEND_TIMEOUT_SECS` - Backend I/O timeout in seconds (default: 30)
    /// - `BACKEND_POOL_SIZE` - Pooled backend connections (default: 1)
    /// - `MAX_LINE_LENGTH` - Longest client line in bytes (default: 1024)
    /// - `ADMIN_PORT` - Admin HTTP port (default: disabled)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup, then validates it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            backend_host: lookup("BACKEND_HOST").unwrap_or(defaults.backend_host),
            backend_port: parse_var(&lookup, "BACKEND_PORT", defaults.backend_port)?,
            listen_host: lookup("LISTEN_HOST").unwrap_or(defaults.listen_host),
            listen_port: parse_var(&lookup, "LISTEN_PORT", defaults.listen_port)?,
            cache_capacity: parse_var(&lookup, "CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_ttl_secs: parse_var(&lookup, "CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            backend_timeout_secs: parse_var(
                &lookup,
                "BACKEND_TIMEOUT_SECS",
                defaults.backend_timeout_secs,
            )?,
            backend_pool_size: parse_var(
                &lookup,
                "BACKEND_POOL_SIZE",
                defaults.backend_pool_size,
            )?,
            max_line_length: parse_var(&lookup, "MAX_LINE_LENGTH", defaults.max_line_length)?,
            admin_port: match lookup("ADMIN_PORT") {
                Some(raw) => Some(parse_value("ADMIN_PORT", &raw)?),
                None => None,
            },
        };

        config.validate()?;
        Ok(config)
    }

    // == Validation ==
    /// Checks every numeric setting is in range.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(ProxyError::Config(
                "cache capacity must be greater than 0".to_string(),
            ));
        }
        if self.backend_pool_size == 0 {
            return Err(ProxyError::Config(
                "backend pool size must be greater than 0".to_string(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(ProxyError::Config(
                "max line length must be greater than 0".to_string(),
            ));
        }
        seconds_to_duration("cache ttl", self.cache_ttl_secs)?;
        seconds_to_duration("backend timeout", self.backend_timeout_secs)?;
        Ok(())
    }

    /// Entry lifetime as a Duration.
    pub fn cache_ttl(&self) -> Result<Duration> {
        seconds_to_duration("cache ttl", self.cache_ttl_secs)
    }

    /// Backend round trip timeout as a Duration.
    pub fn backend_timeout(&self) -> Result<Duration> {
        seconds_to_duration("backend timeout", self.backend_timeout_secs)
    }

    /// `host:port` of the backing Redis instance.
    pub fn backend_addr(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }

    /// `host:port` the client listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_host: "127.0.0.1".to_string(),
            backend_port: 6379,
            listen_host: "127.0.0.1".to_string(),
            listen_port: 5555,
            cache_capacity: 1000,
            cache_ttl_secs: 7200.0,
            backend_timeout_secs: 30.0,
            backend_pool_size: 1,
            max_line_length: 1024,
            admin_port: None,
        }
    }
}

// == Helpers ==

/// Converts a positive, finite number of seconds to a Duration.
pub fn seconds_to_duration(what: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ProxyError::Config(format!(
            "{} must be a positive number of seconds, got {}",
            what, secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ProxyError::Config(format!("{} is out of range: {}", what, e)))
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ProxyError::Config(format!("{} has invalid value '{}'", name, raw)))
}
