//! Uniform spectrum data model for the specio toolkit
//!
//! Every format-specific reader in the `specio` workspace populates a
//! [`SpecFile`] and every writer consumes one; this crate defines that
//! shared shape and the invariants readers are expected to uphold before
//! calling [`SpecFile::cleanup_after_load`].

#![deny(missing_docs, missing_debug_implementations)]

mod calibration;
mod error;
mod measurement;
mod specfile;

pub use calibration::{DeviationPair, EnergyCalibration, SharedCalibration};
pub use error::{Error, Result};
pub use measurement::{GpsCoordinate, Measurement, OccupancyStatus, SourceType};
pub use specfile::{DetectorAnalysis, DetectorAnalysisResult, DetectorType, SpecFile};
pub use specio_text::Instant;
