//! Result and Error types for the format dispatcher

use std::path::PathBuf;

/// Type alias for `Result<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for `specio-dispatch`
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Could not open the source file
    #[error("could not open {path}: {source}")]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// No reader accepted the input as any known format
    #[error("no reader recognised the input as a known spectrum file format")]
    NoReaderAccepted,

    /// Propagated from the IAEA SPE reader, when a hint pins it
    #[error(transparent)]
    Spe(#[from] specio_spe::Error),

    /// Propagated from the binary SPC reader, when a hint pins it
    #[error(transparent)]
    Spc(#[from] specio_spc::Error),

    /// Propagated from the PCF reader, when a hint pins it
    #[error(transparent)]
    Pcf(#[from] specio_pcf::Error),

    /// Propagated I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
