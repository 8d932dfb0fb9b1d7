//! Cache Proxy - A read-through caching proxy for Redis lookups
//!
//! Answers `GET key` requests from an in-memory LRU cache with TTL expiry,
//! falling back to the backing Redis over RESP on a miss.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;

pub use api::AppState;
pub use backend::BackendClient;
pub use cache::{CacheStore, SharedCache};
pub use config::Config;
pub use error::{ProxyError, Result};
pub use proxy::ProxyServer;
