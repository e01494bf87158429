//! Result and Error types for the PCF reader/writer

use std::path::PathBuf;

/// Type alias for `Result<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for `specio-pcf`
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The header's version word was not the one this reader understands
    #[error("not a PCF file: header version word is {0}, expected 1")]
    NotPcf(u16),

    /// A preamble detector name did not parse as `<panel><column><mca>[N]`
    #[error("unrecognised detector name {0:?}, expected <panel A-D><column a-d><mca 1-8>[N]")]
    UnrecognisedDetectorName(String),

    /// The file ended before a fixed-size record could be fully read
    #[error("unexpected end of file reading {0}")]
    Truncated(&'static str),

    /// No measurements with channel data were given to write
    #[error("PCF file contains no measurements with channel data")]
    NoMeasurements,

    /// PCF requires every measurement to declare the same channel count;
    /// resampling to a common count is the caller's responsibility
    #[error("measurement on {detector:?} has {found} channels, expected {expected} to match the rest of the file")]
    NonUniformChannelCount {
        /// Detector name of the offending measurement
        detector: String,
        /// Channel count declared by the first measurement in the file
        expected: usize,
        /// Channel count actually carried by this measurement
        found: usize,
    },

    /// Channel count exceeds what a `u16` PCF header field can declare
    #[error("{0} channels exceeds the maximum a PCF header can declare (65535)")]
    TooManyChannels(usize),

    /// `write_pcf` refuses to silently overwrite an existing file
    #[error("refusing to overwrite existing file {0}")]
    DestinationExists(PathBuf),

    /// Propagated from `specio-core`
    #[error(transparent)]
    Core(#[from] specio_core::Error),

    /// Propagated I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
