//! Result and Error types for the IAEA SPE reader/writer

/// Type alias for `Result<T, spe::Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for `specio-spe`
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No `$ENDRECORD:`-terminated (or implicit end-of-file) measurement
    /// carried any channel data
    #[error("SPE file contains no measurements with channel data")]
    NoMeasurements,

    /// A required numeric field could not be parsed
    #[error("malformed {field}: {value:?}")]
    MalformedField {
        /// Name of the field that failed to parse
        field: &'static str,
        /// The raw text that failed to parse
        value: String,
    },

    /// Underlying `specio-core` data model rejected a constructed value
    #[error(transparent)]
    Core(#[from] specio_core::Error),

    /// I/O failure reading or writing the underlying stream
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
