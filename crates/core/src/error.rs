//! Result and Error types for the specio data model

/// Type alias for `Result<T, core::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for `specio-core`
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Energy calibration coefficients failed validation (non-finite leading
    /// coefficient, non-positive slope, or non-monotonic energy sequence)
    #[error("invalid energy calibration: {0}")]
    InvalidCalibration(String),

    /// A deviation pair list was not sorted by ascending energy
    #[error("deviation pairs must be sorted by ascending energy")]
    UnsortedDeviationPairs,

    /// GPS coordinate outside of the valid range (|lat| <= 90, |lon| <= 180)
    #[error("invalid GPS coordinate: lat={lat}, lon={lon}")]
    InvalidGpsCoordinate {
        /// Latitude in degrees
        lat: f64,
        /// Longitude in degrees
        lon: f64,
    },

    /// Attempted to sum measurements that do not share an energy calibration
    #[error("cannot sum measurements with differing energy calibrations")]
    MismatchedCalibrationsInSum,

    /// Attempted to sum an empty set of measurements
    #[error("no measurements matched the requested sample/detector selection")]
    EmptySumSelection,

    /// A gamma or neutron channel count sequence failed to match its declared sum
    #[error("channel sum mismatch: declared {declared}, computed {computed}")]
    ChannelSumMismatch {
        /// Sum declared by the file's metadata
        declared: f64,
        /// Sum actually computed from the channel data
        computed: f64,
    },
}
