//! QR-code and `mailto:` spectrum URI encoding and decoding.
//!
//! This crate implements the `raddata://G0/...` wire format: a compact,
//! percent-encoded representation of one or more gamma/neutron spectra
//! suitable for carrying inside a QR code or an email body. See
//! [`encode_spectrum`]/[`encode_spectra`] to produce URIs and
//! [`decode_spectrum_urls`]/[`decode_spectrum_url_parts`] to recover spectra
//! from them.
#![deny(missing_docs, missing_debug_implementations)]

mod channel;
mod decode;
mod encode;
mod error;
mod mailto;
mod payload;
mod types;

pub use decode::{decode_spectrum_url_parts, decode_spectrum_urls};
pub use encode::{encode_spectra, encode_spectrum};
pub use error::{Error, Result};
pub use mailto::build_mailto_uri;
pub use types::{EncodeOptions, UriDeviationPair, UriSourceType, UrlSpectrum};
