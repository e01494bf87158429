//! Primitive binary/text codecs backing the specio URI pipeline

#![deny(missing_docs, missing_debug_implementations)]

mod basex;
mod counted_zero;
mod crc;
mod deflate;
mod error;
mod percent;
mod stream_vbyte;

pub use basex::{base45_decode, base45_encode, base64url_decode, base64url_encode};
pub use counted_zero::{compress_to_counted_zeros, expand_counted_zeros, MAX_EXPANDED_SAMPLES, ZERO_THRESHOLD};
pub use crc::checksum as crc16_arc;
pub use deflate::{compress as deflate_compress, decompress as deflate_decompress};
pub use error::{Error, Result};
pub use percent::{decode as percent_decode, encode_mailto as percent_encode_mailto, encode_qr as percent_encode_qr};
pub use stream_vbyte::{decode as stream_vbyte_decode, encode as stream_vbyte_encode};
