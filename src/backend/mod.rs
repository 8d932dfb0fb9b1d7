//! Backend Module
//!
//! Talks to the backing Redis instance: RESP framing for single-key
//! lookups and a small pool of serialized connections.

mod client;
mod codec;

pub use client::{BackendClient, BackendConnection};
pub use codec::{encode_lookup, BackendReply, RespCodec, LOOKUP_VERB, MAX_BULK_LEN};
