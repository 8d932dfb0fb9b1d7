//! Backend client
//!
//! Owns a small pool of connections to the backing Redis. Each connection
//! carries at most one request/reply cycle at a time; callers routed to a
//! busy connection wait on its lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::backend::{BackendReply, RespCodec};
use crate::error::{ProxyError, Result};

// == Backend Connection ==
/// One framed socket to the backing store.
#[derive(Debug)]
pub struct BackendConnection {
    framed: Framed<TcpStream, RespCodec>,
}

impl BackendConnection {
    /// Opens a connection, giving up after `limit`.
    pub async fn connect(addr: &str, limit: Duration) -> Result<Self> {
        let stream = timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| ProxyError::BackendTimeout(limit))?
            .map_err(|e| {
                ProxyError::BackendConnection(format!("failed to connect to {}: {}", addr, e))
            })?;
        stream.set_nodelay(true).ok();

        Ok(Self {
            framed: Framed::new(stream, RespCodec::new()),
        })
    }

    /// Runs one encode/send/receive/decode cycle bounded by `limit`.
    pub async fn lookup(&mut self, key: &[u8], limit: Duration) -> Result<BackendReply> {
        let cycle = async {
            self.framed.send(key).await?;
            match self.framed.next().await {
                Some(reply) => reply,
                None => Err(ProxyError::BackendConnection(
                    "backend closed the connection".to_string(),
                )),
            }
        };

        match timeout(limit, cycle).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(ProxyError::Io(e))) => Err(ProxyError::BackendConnection(e.to_string())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProxyError::BackendTimeout(limit)),
        }
    }
}

// == Backend Client ==
/// Pooled, serialized access to the backing store.
#[derive(Debug)]
pub struct BackendClient {
    addr: String,
    timeout: Duration,
    slots: Vec<Mutex<Option<BackendConnection>>>,
    next: AtomicUsize,
}

impl BackendClient {
    /// Opens `pool_size` connections to `addr` up front.
    ///
    /// Fails with a configuration error for an empty pool or zero timeout,
    /// and with a backend error if any connection cannot be opened.
    pub async fn connect(addr: impl Into<String>, pool_size: usize, timeout: Duration) -> Result<Self> {
        if pool_size == 0 {
            return Err(ProxyError::Config(
                "backend pool size must be greater than 0".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(ProxyError::Config(
                "backend timeout must be greater than 0".to_string(),
            ));
        }

        let addr = addr.into();
        let mut slots = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = BackendConnection::connect(&addr, timeout).await?;
            slots.push(Mutex::new(Some(conn)));
        }
        info!(%addr, pool_size, "Connected to backend");

        Ok(Self {
            addr,
            timeout,
            slots,
            next: AtomicUsize::new(0),
        })
    }

    // == Lookup ==
    /// Fetches `key` from the backing store.
    ///
    /// A connection whose cycle fails is discarded, since its stream may
    /// hold a partial reply. The failure is returned to the caller without
    /// retry; the next lookup routed to that slot reconnects first.
    pub async fn lookup(&self, key: &str) -> Result<BackendReply> {
        let slot_idx = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let mut slot = self.slots[slot_idx].lock().await;

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => {
                debug!(slot = slot_idx, addr = %self.addr, "Reconnecting to backend");
                BackendConnection::connect(&self.addr, self.timeout).await?
            }
        };

        match conn.lookup(key.as_bytes(), self.timeout).await {
            Ok(reply) => {
                *slot = Some(conn);
                Ok(reply)
            }
            Err(e) => {
                warn!(slot = slot_idx, key, error = %e, "Backend lookup failed, dropping connection");
                Err(e)
            }
        }
    }

    /// Convenience wrapper returning the value for found keys.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(match self.lookup(key).await? {
            BackendReply::Found(value) => Some(value),
            BackendReply::NotFound => None,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}
