//! Base-45 (RFC 9285) and URL-safe Base-64 (RFC 4648 §5) wrappers

use crate::error::{Error, Result};
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

/// Encode bytes as RFC 9285 Base-45
pub fn base45_encode(input: &[u8]) -> String {
    base45::encode(input)
}

/// Decode an RFC 9285 Base-45 string
pub fn base45_decode(input: &str) -> Result<Vec<u8>> {
    base45::decode(input).map_err(|_| Error::InvalidAlphabet("base-45"))
}

/// Encode bytes as URL-safe Base-64, with or without `=` padding
pub fn base64url_encode(input: &[u8], padded: bool) -> String {
    if padded {
        URL_SAFE.encode(input)
    } else {
        URL_SAFE_NO_PAD.encode(input)
    }
}

/// Decode a URL-safe Base-64 string, accepting input with or without padding
pub fn base64url_decode(input: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|_| Error::InvalidAlphabet("base-64url"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base45_round_trips_arbitrary_bytes() {
        let data = b"\x00\x01\xfe\xffHello, RADDATA!";
        let encoded = base45_encode(data);
        assert_eq!(base45_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn base64url_round_trips_with_and_without_padding() {
        let data = b"arbitrary spectrum payload bytes";
        for padded in [true, false] {
            let encoded = base64url_encode(data, padded);
            assert_eq!(base64url_decode(&encoded).unwrap(), data);
        }
    }

    #[test]
    fn base45_rejects_invalid_characters() {
        assert!(base45_decode("not_base45!!").is_err());
    }
}
