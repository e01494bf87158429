//! A modular toolkit for parsing, manipulating, and writing gamma-ray
//! spectrum files
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Flatten the default crate - always available
#[doc(inline)]
pub use specio_core as core;

// Re-exports of crates that are behind feature flags
#[cfg(feature = "text")]
#[cfg_attr(docsrs, doc(cfg(feature = "text")))]
#[doc(inline)]
pub use specio_text as text;

#[cfg(feature = "uri")]
#[cfg_attr(docsrs, doc(cfg(feature = "uri")))]
#[doc(inline)]
pub use specio_uri as uri;

#[cfg(feature = "dispatch")]
#[cfg_attr(docsrs, doc(cfg(feature = "dispatch")))]
#[doc(inline)]
pub use specio_dispatch as dispatch;

#[cfg(feature = "spe")]
#[cfg_attr(docsrs, doc(cfg(feature = "spe")))]
#[doc(inline)]
pub use specio_spe as spe;

#[cfg(feature = "spc")]
#[cfg_attr(docsrs, doc(cfg(feature = "spc")))]
#[doc(inline)]
pub use specio_spc as spc;

#[cfg(feature = "pcf")]
#[cfg_attr(docsrs, doc(cfg(feature = "pcf")))]
#[doc(inline)]
pub use specio_pcf as pcf;

#[cfg(feature = "dispatch")]
#[cfg_attr(docsrs, doc(cfg(feature = "dispatch")))]
#[doc(inline)]
pub use specio_dispatch::{load_file, FormatHint};
