//! Error types for the cache proxy
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for the cache proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Invalid configuration value, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed client line or unexpected backend reply shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Backend round trip did not complete in time
    #[error("Backend timed out after {0:?}")]
    BackendTimeout(Duration),

    /// Backend connection was reset, closed or could not be opened
    #[error("Backend connection error: {0}")]
    BackendConnection(String),

    /// Underlying socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Returns true for errors raised by a backend round trip.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ProxyError::BackendTimeout(_)
                | ProxyError::BackendConnection(_)
                | ProxyError::Protocol(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
