//! IAEA SPE spectrum file reading and writing.
//!
//! SPE is a line-oriented text format driven by `$TAG:` markers, one file
//! potentially holding several `$ENDRECORD:`-delimited measurements. See
//! [`read_spe`] to parse a stream into a [`specio_core::SpecFile`] and
//! [`write_spe`] for the inverse.
#![deny(missing_docs, missing_debug_implementations)]

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::read_spe;
pub use writer::write_spe;
