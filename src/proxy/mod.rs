//! Proxy Module
//!
//! Client-facing side of the proxy: the text line protocol and the
//! connection-per-task server.

mod protocol;
mod server;

pub use protocol::{
    ClientCodec, Command, Reply, DEFAULT_MAX_LINE_LENGTH, FAREWELL, GREETING, USAGE_ERROR,
};
pub use server::ProxyServer;
