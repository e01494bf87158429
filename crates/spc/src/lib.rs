//! Binary Ortec SPC spectrum file reading and writing.
//!
//! SPC is a sequence of 128-byte records. Record 0 is a header of record
//! pointers (1-based, zero meaning absent); the records they point to hold
//! the calibration polynomial, acquisition metadata, an optional expansion
//! header leading to a textual identification report, and the channel data
//! itself. See [`read_spc`] and [`write_spc`].
#![deny(missing_docs, missing_debug_implementations)]

mod error;
mod reader;
mod serial;
mod writer;

pub use error::{Error, Result};
pub use reader::read_spc;
pub use serial::{guess_submodel, DetectiveSubmodel};
pub use writer::write_spc;

/// Fixed record size every SPC field offset is a multiple of
pub(crate) const RECORD_LEN: u64 = 128;
