//! Client line protocol
//!
//! Clients send one command per line (`GET key` or `QUIT`); every reply is
//! a single line terminated by CRLF.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::error::{ProxyError, Result};

pub const GREETING: &str =
    "You are connected to the cache proxy. Use 'GET key' to look up a value, QUIT to close connection";
pub const USAGE_ERROR: &str = "Please use 'GET key' command format";
pub const FAREWELL: &str = "Bye";

pub const GET_VERB: &str = "GET";
pub const QUIT_TOKEN: &str = "QUIT";

/// Reply line terminator
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Default bound on a single client line, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

// == Command ==
/// A parsed client line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `GET <key>`
    Get(String),
    /// `QUIT`
    Quit,
    /// Any other shape, including blank and over-long lines
    Invalid,
}

impl Command {
    /// Parses a line: exactly `GET <key>` or `QUIT`, verbs case-sensitive.
    pub fn parse(line: &str) -> Self {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [QUIT_TOKEN] => Command::Quit,
            [GET_VERB, key] => Command::Get((*key).to_string()),
            _ => Command::Invalid,
        }
    }
}

// == Reply ==
/// A single reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Informational or error text
    Line(String),
    /// Raw value bytes as stored in the backend
    Value(Bytes),
}

impl Reply {
    pub fn greeting() -> Self {
        Reply::Line(GREETING.to_string())
    }

    pub fn usage() -> Self {
        Reply::Line(USAGE_ERROR.to_string())
    }

    pub fn farewell() -> Self {
        Reply::Line(FAREWELL.to_string())
    }

    pub fn not_found(key: &str) -> Self {
        Reply::Line(format!("Nothing exists for key {}", key))
    }

    pub fn backend_failure(key: &str) -> Self {
        Reply::Line(format!("Failed to fetch key {} from backend", key))
    }
}

// == Client Codec ==
/// Splits the client byte stream into commands and frames replies.
///
/// Lines longer than the bound are discarded up to their terminator and
/// surface as `Command::Invalid`, as do lines that are not UTF-8, so the
/// connection survives both.
#[derive(Debug, Clone)]
pub struct ClientCodec {
    lines: LinesCodec,
}

impl ClientCodec {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_line_length),
        }
    }

    fn command(result: std::result::Result<Option<String>, LinesCodecError>) -> Result<Option<Command>> {
        match result {
            Ok(Some(line)) => Ok(Some(Command::parse(&line))),
            Ok(None) => Ok(None),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Command::Invalid)),
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(Some(Command::Invalid))
            }
            Err(LinesCodecError::Io(e)) => Err(ProxyError::Io(e)),
        }
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for ClientCodec {
    type Item = Command;
    type Error = ProxyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>> {
        Self::command(self.lines.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Command>> {
        Self::command(self.lines.decode_eof(src))
    }
}

impl Encoder<Reply> for ClientCodec {
    type Error = ProxyError;

    fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> Result<()> {
        let body: &[u8] = match &reply {
            Reply::Line(text) => text.as_bytes(),
            Reply::Value(value) => &value[..],
        };
        dst.reserve(body.len() + LINE_TERMINATOR.len());
        dst.put_slice(body);
        dst.put_slice(LINE_TERMINATOR);
        Ok(())
    }
}
