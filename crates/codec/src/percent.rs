//! Percent-encoding with the two character sets the URI codec needs

use crate::error::{Error, Result};
use percent_encoding::{percent_decode_str, AsciiSet, NON_ALPHANUMERIC};

/// Full URL reserved-character set used for direct-to-QR encoding:
/// `" $&+,:;=?@'"<>#%{}|\^~[]`/"`
const QR_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'!')
    .remove(b'*')
    .remove(b')')
    .remove(b'(');

/// Reduced RFC 6068 `mailto:` set: `"%&;=/?#[]"`
const MAILTO_SET: &AsciiSet = &AsciiSet::EMPTY
    .add(b'%')
    .add(b'&')
    .add(b';')
    .add(b'=')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'[')
    .add(b']');

/// Percent-encode for direct QR placement, escaping the full reserved set
pub fn encode_qr(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, QR_SET).to_string()
}

/// Percent-encode for a `mailto:` URI body, escaping only the RFC 6068
/// reduced set
pub fn encode_mailto(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, MAILTO_SET).to_string()
}

/// Percent-decode a string, rejecting malformed escape sequences
pub fn decode(input: &str) -> Result<String> {
    // `percent_decode_str` treats an isolated `%` not followed by two hex
    // digits as a literal, so malformed triples are detected explicitly.
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            let valid = hex
                .map(|h| h.iter().all(|b| b.is_ascii_hexdigit()))
                .unwrap_or(false);
            if !valid {
                return Err(Error::InvalidPercentEscape);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| Error::InvalidPercentEscape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_encoding_round_trips() {
        let original = "I:F T:295.1,300 S:0,1,2";
        let encoded = encode_qr(original);
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn mailto_encoding_only_escapes_reduced_set() {
        let original = "Spectrum URI raddata://G0/00/ABC=1&2";
        let encoded = encode_mailto(original);
        assert!(encoded.contains("raddata"));
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn hex_digits_are_uppercase() {
        let encoded = encode_qr(" ");
        assert_eq!(encoded, "%20");
    }

    #[test]
    fn rejects_malformed_escape() {
        assert!(decode("abc%2").is_err());
        assert!(decode("abc%zz").is_err());
    }
}
