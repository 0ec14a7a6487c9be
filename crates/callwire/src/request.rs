//! # Request Format
//!
//! `name "\n" payload`, read in a single receive of at most `MAX_MESSAGE`
//! bytes. There is no length prefix: anything past `MAX_MESSAGE` is never
//! read by the server.

use crate::error::Error;
use crate::error::Result;

/// Largest request or reply read in one receive.
pub const MAX_MESSAGE: usize = 256;

/// Separates the function name from the payload.
pub const DELIMITER: u8 = b'\n';

/// A request split into its two parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub name: &'a str,
    pub payload: &'a [u8],
}

pub fn encode_request(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 1 + payload.len());
    out.extend_from_slice(name.as_bytes());
    out.push(DELIMITER);
    out.extend_from_slice(payload);
    out
}

/// Splits at the first newline. The payload may itself contain newlines.
pub fn split_request(bytes: &[u8]) -> Result<Request<'_>> {
    let at = bytes
        .iter()
        .position(|b| *b == DELIMITER)
        .ok_or(Error::Malformed)?;

    let name = std::str::from_utf8(&bytes[..at]).map_err(|_| Error::Malformed)?;
    Ok(Request {
        name,
        payload: &bytes[at + 1..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_at_first_newline() {
        let bytes = encode_request("Echo", b"a\nb");
        let req = split_request(&bytes).unwrap();
        assert_eq!(req.name, "Echo");
        assert_eq!(req.payload, b"a\nb");
    }

    #[test]
    fn test_empty_payload() {
        let req = split_request(b"NoFunction\n").unwrap();
        assert_eq!(req.name, "NoFunction");
        assert!(req.payload.is_empty());
    }

    #[test]
    fn test_missing_newline_is_malformed() {
        assert_eq!(split_request(b"Divide"), Err(Error::Malformed));
        assert_eq!(split_request(b""), Err(Error::Malformed));
    }

    #[test]
    fn test_name_must_be_utf8() {
        assert_eq!(split_request(b"\xff\xfe\n"), Err(Error::Malformed));
    }
}
