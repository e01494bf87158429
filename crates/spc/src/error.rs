//! Result and Error types for the binary SPC reader/writer

/// Type alias for `Result<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for `specio-spc`
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The first header word was not `1`
    #[error("not a binary SPC file: header word 0 is {0}, expected 1")]
    NotSpc(i16),

    /// The channel-data format word was neither `1` (integer) nor `5` (float)
    #[error("unrecognised channel data format word {0}, expected 1 or 5")]
    UnknownChannelFormat(i16),

    /// A record pointer referenced a location past the end of the file
    #[error("record pointer {pointer} ({kind}) points past the end of the file")]
    PointerOutOfRange {
        /// 1-based record number from the header
        pointer: i16,
        /// What the pointer was supposed to reference
        kind: &'static str,
    },

    /// Declared record count could not hold the declared channel count
    #[error("{record_count} spectrum records cannot hold {channel_count} channels")]
    TooFewSpectrumRecords {
        /// `wSPCRCN`
        record_count: i16,
        /// `n_channel`
        channel_count: u16,
    },

    /// The file ended before a fixed-size record could be fully read
    #[error("unexpected end of file reading {0}")]
    Truncated(&'static str),

    /// A measurement carried no channel data to write
    #[error("SPC file contains no measurements with channel data")]
    NoMeasurements,

    /// Channel count exceeds what a `u16` SPC header field can declare
    #[error("{0} channels exceeds the maximum a binary SPC header can declare (65535)")]
    TooManyChannels(usize),

    /// Propagated from `specio-core`
    #[error(transparent)]
    Core(#[from] specio_core::Error),

    /// Propagated I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
