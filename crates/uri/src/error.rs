//! Result and Error types for the specio URI codec

/// Type alias for `Result<T, uri::Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for `specio-uri`
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Input did not begin with a recognized `raddata://G0/` variant
    #[error("not a recognized spectrum URI")]
    NotASpectrumUri,

    /// An options byte set a bit outside the known flag set
    #[error("options byte 0x{0:02X} sets an unrecognized bit")]
    UnknownOptionBit(u8),

    /// The requested part count was outside `[1, 9]`
    #[error("part count must be in 1..=9, got {0}")]
    InvalidPartCount(usize),

    /// More than one spectrum was requested with more than one part
    #[error("multi-spectrum encoding requires exactly one part")]
    MultiSpectrumRequiresOnePart,

    /// A required `/`-delimited URI field was missing or malformed
    #[error("malformed URI field: {0}")]
    MalformedField(String),

    /// The CRC-16 recorded in a multi-part URI did not match the payload
    #[error("CRC mismatch: header said {expected:#06X}, computed {actual:#06X}")]
    CrcMismatch {
        /// CRC-16 value recorded in the URI header
        expected: u16,
        /// CRC-16 value computed from the payload
        actual: u16,
    },

    /// A channel count exceeded the 65535 single-integer limit
    #[error("channel count {0} exceeds the 65535 maximum")]
    ChannelCountTooLarge(u32),

    /// A lower-level codec operation failed
    #[error(transparent)]
    Codec(#[from] specio_codec::Error),
}
