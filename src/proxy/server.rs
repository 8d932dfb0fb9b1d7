//! Proxy server
//!
//! Accepts client connections and runs one task per connection. Each task
//! walks the connection state machine:
//!
//! ```text
//! AwaitingLine -> Dispatching -> AwaitingLine ... -> Closed
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendClient, BackendReply};
use crate::cache::SharedCache;
use crate::error::Result;
use crate::proxy::{ClientCodec, Command, Reply};

/// Per-connection state.
#[derive(Debug)]
enum ConnectionState {
    AwaitingLine,
    Dispatching(Command),
    Closed,
}

// == Proxy Server ==
/// Read-through caching proxy in front of a backend.
#[derive(Clone)]
pub struct ProxyServer {
    cache: SharedCache,
    backend: Arc<BackendClient>,
    max_line_length: usize,
}

impl ProxyServer {
    pub fn new(cache: SharedCache, backend: Arc<BackendClient>, max_line_length: usize) -> Self {
        Self {
            cache,
            backend,
            max_line_length,
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    // == Accept Loop ==
    /// Serves clients from `listener` until `shutdown` resolves.
    ///
    /// Accept errors are logged and the loop continues; connection tasks
    /// already running are left to finish on their own.
    pub async fn run<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Proxy listening on {}", listener.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Proxy stopped accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        stream.set_nodelay(true).ok();
                        let server = self.clone();
                        tokio::spawn(async move {
                            server.serve_client(stream, peer).await;
                        });
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }
    }

    async fn serve_client<S>(&self, stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        info!(%peer, "Client connected");
        match self.handle_connection(stream).await {
            Ok(()) => info!(%peer, "Client disconnected"),
            Err(e) => warn!(%peer, error = %e, "Client connection ended with error"),
        }
    }

    // == Connection State Machine ==
    /// Runs one client session to completion.
    ///
    /// Returns `Ok` when the client quits or closes its end; write failures
    /// (e.g. the client vanished mid-request) end the session with an error.
    pub async fn handle_connection<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, ClientCodec::new(self.max_line_length));
        framed.send(Reply::greeting()).await?;

        let mut state = ConnectionState::AwaitingLine;
        loop {
            state = match state {
                ConnectionState::AwaitingLine => match framed.next().await {
                    Some(Ok(command)) => ConnectionState::Dispatching(command),
                    Some(Err(e)) => return Err(e),
                    None => ConnectionState::Closed,
                },
                ConnectionState::Dispatching(Command::Quit) => {
                    framed.send(Reply::farewell()).await?;
                    ConnectionState::Closed
                }
                ConnectionState::Dispatching(Command::Invalid) => {
                    framed.send(Reply::usage()).await?;
                    ConnectionState::AwaitingLine
                }
                ConnectionState::Dispatching(Command::Get(key)) => {
                    let reply = self.resolve(&key).await;
                    framed.send(reply).await?;
                    ConnectionState::AwaitingLine
                }
                ConnectionState::Closed => return Ok(()),
            };
        }
    }

    // == Resolve ==
    /// Answers a lookup from the cache, falling back to the backend.
    ///
    /// The cache lock is taken once for the read and once for the write,
    /// and is never held while the backend is being queried. Keys the
    /// backend does not have are not cached.
    pub async fn resolve(&self, key: &str) -> Reply {
        let cached = self.cache.lock().await.get(key);
        if let Some(value) = cached {
            debug!(key, "Cache hit");
            return Reply::Value(value);
        }
        debug!(key, "Cache miss");

        match self.backend.lookup(key).await {
            Ok(BackendReply::Found(value)) => {
                if let Err(e) = self.cache.lock().await.set(key, value.clone()) {
                    warn!(key, error = %e, "Failed to cache backend value");
                }
                Reply::Value(value)
            }
            Ok(BackendReply::NotFound) => Reply::not_found(key),
            Err(e) => {
                warn!(key, error = %e, "Backend lookup failed");
                Reply::backend_failure(key)
            }
        }
    }
}
