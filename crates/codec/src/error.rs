//! Result and Error types for the specio codec primitives

/// Type alias for `Result<T, codec::Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for `specio-codec`
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A zero was followed by a non-positive run length during expansion
    #[error("counted-zero run length must be positive")]
    NonPositiveZeroRun,

    /// Expanding a counted-zero sequence would exceed the channel cap
    #[error("counted-zero expansion exceeds the {0}-sample cap")]
    ZeroExpansionTooLarge(usize),

    /// More than 65535 integers were given to the StreamVByte encoder
    #[error("stream-vbyte input has {0} integers, more than the 65535 maximum")]
    StreamVByteTooManyIntegers(usize),

    /// The StreamVByte buffer ended before the declared integer count byte
    #[error("stream-vbyte input is shorter than the 2-byte count prefix")]
    StreamVByteMissingCount,

    /// The StreamVByte buffer ended before its control bytes
    #[error("stream-vbyte input is shorter than its control-byte region")]
    StreamVByteMissingControlBytes,

    /// The StreamVByte buffer ended partway through a packed integer
    #[error("stream-vbyte input truncated while decoding integer {0}")]
    StreamVByteTruncated(usize),

    /// A character outside the target alphabet appeared in a Base-X decode
    #[error("invalid {0} character in input")]
    InvalidAlphabet(&'static str),

    /// DEFLATE (de)compression failed
    #[error("deflate error: {0}")]
    Deflate(String),

    /// A percent-escape sequence was malformed
    #[error("invalid percent-escape sequence")]
    InvalidPercentEscape,
}
