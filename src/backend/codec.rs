//! RESP codec for backend lookups
//!
//! Encodes `GET key` as a two element multi-bulk command and decodes bulk
//! string replies by their declared length.
//!
//! Request:
//! ```text
//! *2\r\n$3\r\nGET\r\n$<key len>\r\n<key>\r\n
//! ```
//! Reply:
//! ```text
//! $<len>\r\n<len bytes>\r\n   found
//! $-1\r\n                     not found
//! -<message>\r\n              backend error
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProxyError, Result};

/// Verb sent for a single-key lookup
pub const LOOKUP_VERB: &[u8] = b"GET";

const CRLF: &[u8] = b"\r\n";

/// Longest bulk header line (marker + length digits) accepted before a CRLF
const MAX_HEADER_LEN: usize = 32;

/// Longest error reply line accepted before a CRLF
const MAX_ERROR_LEN: usize = 4096;

/// Largest bulk string the backend may legally return
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Decoded backend reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReply {
    Found(Bytes),
    NotFound,
}

/// Codec for the backend's request/response framing.
#[derive(Debug, Default, Clone, Copy)]
pub struct RespCodec;

impl RespCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Appends the lookup command for `key` to `dst`.
pub fn encode_lookup(key: &[u8], dst: &mut BytesMut) {
    dst.reserve(32 + key.len());
    dst.put_slice(b"*2\r\n");
    put_bulk(dst, LOOKUP_VERB);
    put_bulk(dst, key);
}

fn put_bulk(dst: &mut BytesMut, data: &[u8]) {
    dst.put_u8(b'$');
    dst.put_slice(data.len().to_string().as_bytes());
    dst.put_slice(CRLF);
    dst.put_slice(data);
    dst.put_slice(CRLF);
}

impl<'a> Encoder<&'a [u8]> for RespCodec {
    type Error = ProxyError;

    fn encode(&mut self, key: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        if key.is_empty() {
            return Err(ProxyError::Protocol("lookup key must not be empty".to_string()));
        }
        encode_lookup(key, dst);
        Ok(())
    }
}

impl Decoder for RespCodec {
    type Item = BackendReply;
    type Error = ProxyError;

    /// Returns `Ok(None)` until a complete reply is buffered.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BackendReply>> {
        let Some(&marker) = src.first() else {
            return Ok(None);
        };

        match marker {
            b'$' => match find_crlf(src, MAX_HEADER_LEN)? {
                Some(header_end) => decode_bulk(src, header_end),
                None => Ok(None),
            },
            b'-' => {
                let Some(header_end) = find_crlf(src, MAX_ERROR_LEN)? else {
                    return Ok(None);
                };
                let message = String::from_utf8_lossy(&src[1..header_end]).into_owned();
                src.advance(header_end + CRLF.len());
                Err(ProxyError::Protocol(format!("backend error reply: {}", message)))
            }
            other => Err(ProxyError::Protocol(format!(
                "unexpected reply type marker {:?}",
                other as char
            ))),
        }
    }
}

/// Position of the CRLF that ends the header line, if buffered.
fn find_crlf(src: &BytesMut, max_len: usize) -> Result<Option<usize>> {
    let window = &src[..src.len().min(max_len + CRLF.len())];
    match window.windows(CRLF.len()).position(|w| w == CRLF) {
        Some(pos) => Ok(Some(pos)),
        None if src.len() > max_len + 1 => Err(ProxyError::Protocol(
            "reply header is not terminated".to_string(),
        )),
        None => Ok(None),
    }
}

fn decode_bulk(src: &mut BytesMut, header_end: usize) -> Result<Option<BackendReply>> {
    let declared = std::str::from_utf8(&src[1..header_end])
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ProxyError::Protocol("bulk length is not a number".to_string()))?;

    let body_start = header_end + CRLF.len();
    if declared == -1 {
        src.advance(body_start);
        return Ok(Some(BackendReply::NotFound));
    }
    let len = usize::try_from(declared)
        .ok()
        .filter(|len| *len <= MAX_BULK_LEN)
        .ok_or_else(|| ProxyError::Protocol(format!("invalid bulk length {}", declared)))?;

    let frame_len = body_start + len + CRLF.len();
    if src.len() < frame_len {
        src.reserve(frame_len - src.len());
        return Ok(None);
    }
    if &src[body_start + len..frame_len] != CRLF {
        return Err(ProxyError::Protocol(
            "bulk payload is not followed by CRLF".to_string(),
        ));
    }

    src.advance(body_start);
    let value = src.split_to(len).freeze();
    src.advance(CRLF.len());
    Ok(Some(BackendReply::Found(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Result<Option<BackendReply>> {
        let mut buf = BytesMut::from(bytes);
        RespCodec::new().decode(&mut buf)
    }

    #[test]
    fn test_encode_lookup() {
        let mut buf = BytesMut::new();
        RespCodec::new().encode(&b"foo"[..], &mut buf).unwrap();
        assert_eq!(&buf[..], b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n");
    }

    #[test]
    fn test_encode_rejects_empty_key() {
        let mut buf = BytesMut::new();
        assert!(RespCodec::new().encode(&b""[..], &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_bulk_string() {
        assert_eq!(
            decode_all(b"$5\r\nblarf\r\n").unwrap(),
            Some(BackendReply::Found(Bytes::from_static(b"blarf")))
        );
    }

    #[test]
    fn test_decode_nil_is_not_found() {
        assert_eq!(decode_all(b"$-1\r\n").unwrap(), Some(BackendReply::NotFound));
    }

    #[test]
    fn test_decode_empty_bulk_string() {
        assert_eq!(
            decode_all(b"$0\r\n\r\n").unwrap(),
            Some(BackendReply::Found(Bytes::new()))
        );
    }

    #[test]
    fn test_decode_value_containing_crlf() {
        let reply = decode_all(b"$11\r\nab\r\ncd\r\n$-1\r\n").unwrap();
        assert_eq!(
            reply,
            Some(BackendReply::Found(Bytes::from_static(b"ab\r\ncd\r\n$-1")))
        );
    }

    #[test]
    fn test_decode_waits_for_full_payload() {
        let mut codec = RespCodec::new();
        let mut buf = BytesMut::new();

        for chunk in [&b"$1"[..], b"1\r\nhello", b" worl", b"d", b"\r"] {
            buf.extend_from_slice(chunk);
            assert_eq!(codec.decode(&mut buf).unwrap(), None);
        }
        buf.extend_from_slice(b"\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(BackendReply::Found(Bytes::from_static(b"hello world")))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_leaves_following_reply_buffered() {
        let mut codec = RespCodec::new();
        let mut buf = BytesMut::from(&b"$1\r\na\r\n$-1\r\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(BackendReply::Found(Bytes::from_static(b"a")))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(BackendReply::NotFound));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_decode_unexpected_marker() {
        for reply in [&b"+OK\r\n"[..], b":1\r\n", b"*1\r\n$1\r\na\r\n"] {
            assert!(matches!(decode_all(reply), Err(ProxyError::Protocol(_))));
        }
    }

    #[test]
    fn test_decode_error_reply() {
        let err = decode_all(b"-WRONGTYPE Operation against a key\r\n").unwrap_err();
        assert!(err.to_string().contains("WRONGTYPE"));
    }

    #[test]
    fn test_decode_malformed_bulk() {
        assert!(decode_all(b"$abc\r\n").is_err());
        assert!(decode_all(b"$-2\r\n").is_err());
        assert!(decode_all(b"$3\r\nabcXY").is_err());
    }

    #[test]
    fn test_decode_unterminated_header() {
        let long = [b'$'; 64];
        assert!(decode_all(&long).is_err());
    }
}
