//! Fixed 256-byte-record PCF spectrum file reading and writing.
//!
//! Record 0 is a file header; a deviation-pair side table (full-precision
//! `f32` pairs, or a "compressed" `i16`-pair table for detectors whose
//! column letter is `c` or later) follows it; then one preamble-plus-channel-
//! data block per measurement. See [`read_pcf`] and [`write_pcf`].
#![deny(missing_docs, missing_debug_implementations)]

mod error;
mod name;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use name::{parse_detector_name, update_detector_name_from_title, DetectorIndex};
pub use reader::read_pcf;
pub use writer::{write_pcf, write_pcf_to_path};

/// Fixed record size every PCF field offset is a multiple of
pub(crate) const RECORD_LEN: usize = 256;
