//! RESP2 wire codec.
//!
//! Requests are always arrays of bulk strings. Replies may be any of the
//! five RESP2 types:
//! - Simple Strings (`+OK\r\n`)
//! - Errors (`-WRONGTYPE ...\r\n`)
//! - Integers (`:1\r\n`)
//! - Bulk Strings (`$3\r\nfoo\r\n`, `$-1\r\n` for null)
//! - Arrays (`*2\r\n...`, `*-1\r\n` for null)

use bytes::Bytes;

use crate::error::{ClientError, ClientResult};

/// Maximum nesting depth for arrays.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum bulk string size (512MB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array elements.
pub const MAX_ELEMENTS: usize = 1_000_000;

/// A decoded RESP2 value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Bulk string from anything byte-like.
    pub fn bulk(data: impl AsRef<[u8]>) -> Self {
        Self::Bulk(Bytes::copy_from_slice(data.as_ref()))
    }

    pub fn ok() -> Self {
        Self::Simple("OK".into())
    }

    /// Encode this value in RESP2 framing.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Simple(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Self::Error(s) => {
                buf.push(b'-');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Self::Integer(n) => {
                buf.extend_from_slice(format!(":{n}\r\n").as_bytes());
            }
            Self::Bulk(data) => {
                buf.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            Self::Null => buf.extend_from_slice(b"$-1\r\n"),
            Self::Array(items) => {
                buf.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode_into(buf);
                }
            }
        }
    }
}

/// Encode a command as an array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

/// Decode one value from the front of `data`.
///
/// Returns `Ok(None)` when more bytes are needed, otherwise the value and
/// the number of bytes it occupied.
pub fn decode(data: &[u8]) -> ClientResult<Option<(RespValue, usize)>> {
    decode_at(data, 0)
}

/// Split an error line such as `WRONGTYPE Operation against...` into its
/// kind and message.
pub fn split_error(line: &str) -> (String, String) {
    match line.split_once(' ') {
        Some((kind, message)) => (kind.to_string(), message.to_string()),
        None => (line.to_string(), String::new()),
    }
}

fn decode_at(data: &[u8], depth: usize) -> ClientResult<Option<(RespValue, usize)>> {
    let Some(&prefix) = data.first() else {
        return Ok(None);
    };
    if depth > MAX_NESTING_DEPTH {
        return Err(ClientError::Protocol("maximum nesting depth exceeded".into()));
    }
    let Some(line_len) = find_crlf(&data[1..]) else {
        return Ok(None);
    };
    let line = &data[1..1 + line_len];
    let header = 1 + line_len + 2;

    match prefix {
        b'+' => Ok(Some((RespValue::Simple(lossy(line)), header))),
        b'-' => Ok(Some((RespValue::Error(lossy(line)), header))),
        b':' => Ok(Some((RespValue::Integer(parse_int(line)?), header))),
        b'$' => {
            let len = parse_int(line)?;
            if len == -1 {
                return Ok(Some((RespValue::Null, header)));
            }
            let len = usize::try_from(len)
                .map_err(|_| ClientError::Protocol("invalid bulk string length".into()))?;
            if len > MAX_BULK_SIZE {
                return Err(ClientError::Protocol(format!(
                    "bulk string too large: {len} > {MAX_BULK_SIZE}"
                )));
            }
            let end = header + len;
            if data.len() < end + 2 {
                return Ok(None);
            }
            if &data[end..end + 2] != b"\r\n" {
                return Err(ClientError::Protocol("missing CRLF after bulk string".into()));
            }
            let bytes = Bytes::copy_from_slice(&data[header..end]);
            Ok(Some((RespValue::Bulk(bytes), end + 2)))
        }
        b'*' => {
            let len = parse_int(line)?;
            if len == -1 {
                return Ok(Some((RespValue::Null, header)));
            }
            let len = usize::try_from(len)
                .map_err(|_| ClientError::Protocol("invalid array length".into()))?;
            if len > MAX_ELEMENTS {
                return Err(ClientError::Protocol(format!(
                    "array too large: {len} > {MAX_ELEMENTS}"
                )));
            }
            let mut items = Vec::with_capacity(len.min(1024));
            let mut offset = header;
            for _ in 0..len {
                match decode_at(&data[offset..], depth + 1)? {
                    Some((item, consumed)) => {
                        items.push(item);
                        offset += consumed;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((RespValue::Array(items), offset)))
        }
        other => Err(ClientError::Protocol(format!(
            "unexpected type byte 0x{other:02x}"
        ))),
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

fn parse_int(line: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ClientError::Protocol(format!("invalid integer: {:?}", lossy(line))))
}
