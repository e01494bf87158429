//! Line reader, timestamp parser, and numeric splitting for the specio
//! toolkit

#![deny(missing_docs, missing_debug_implementations)]

mod datetime;
mod line_reader;
mod numeric;

pub use datetime::{time_from_string, DateOrder, Instant};
pub use line_reader::LineReader;
pub use numeric::{split_to_floats, SplitOptions, FLT_MIN};
