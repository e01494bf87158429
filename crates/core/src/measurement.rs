//! A single gamma/neutron acquisition and its metadata

use crate::calibration::SharedCalibration;
use crate::error::{Error, Result};
use specio_text::Instant;
use std::time::Duration;

/// How a measurement's source was characterized by the acquiring instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceType {
    /// The source file declared no characterization at all
    #[default]
    Unknown,
    /// A foreground or item acquisition
    Foreground,
    /// A background acquisition intended for subtraction
    Background,
    /// A calibration acquisition (e.g. known-source energy calibration run)
    Calibration,
    /// An intrinsic/activation acquisition
    Intrinsic,
}

/// Portal-monitor occupancy state associated with a measurement, when the
/// source declares one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OccupancyStatus {
    /// Not declared by the source file
    #[default]
    Unknown,
    /// No occupant present during acquisition
    NotOccupied,
    /// An occupant was present during acquisition
    Occupied,
}

/// A GPS fix associated with a measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsCoordinate {
    /// Latitude, degrees, positive north
    pub latitude: f64,
    /// Longitude, degrees, positive east
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Construct a coordinate, validating it lies within `|lat| <= 90`,
    /// `|lon| <= 180`
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidGpsCoordinate {
                lat: latitude,
                lon: longitude,
            });
        }
        Ok(Self { latitude, longitude })
    }

    /// `true` if both components are exactly zero, the conventional marker
    /// for "no fix" used by several instrument vendors
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// One gamma and/or neutron acquisition, plus the metadata describing it
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    /// Gamma channel counts, empty if this measurement has no gamma data
    pub gamma_counts: Vec<f64>,
    /// Neutron counts, empty if this measurement has no neutron data
    pub neutron_counts: Vec<f64>,
    /// `true` if the source declared this measurement as carrying neutron
    /// data, even if `neutron_counts` hasn't been filled in yet
    pub contained_neutron: bool,
    /// Energy calibration applied to `gamma_counts`
    pub energy_calibration: SharedCalibration,
    /// Live time: real time minus dead time
    pub live_time: Duration,
    /// Wall-clock acquisition duration
    pub real_time: Duration,
    /// Acquisition start time, microsecond precision, if the source recorded one
    pub start_time: Option<Instant>,
    /// Sample number, used to group related measurements (e.g. a time series)
    pub sample_number: i32,
    /// Detector name this measurement was acquired on
    pub detector_name: String,
    /// Free-text description of the detector, when the source carries one
    pub detector_description: Option<String>,
    /// How the acquiring instrument characterized this measurement
    pub source_type: SourceType,
    /// Portal-monitor occupancy state, when the source declares one
    pub occupancy: OccupancyStatus,
    /// Speed of the item/person past the detector, m/s, when known
    pub speed: Option<f64>,
    /// GPS fix at acquisition time, if any
    pub gps: Option<GpsCoordinate>,
    /// Title or description string carried by the source file
    pub title: Option<String>,
    /// Free-text remarks specific to this measurement
    pub remarks: Vec<String>,
    /// Recoverable parse oddities recorded against this measurement
    pub parse_warnings: Vec<String>,
    /// Neutron count-rate correction factor, when the source encodes one
    pub neutron_counts_per_second_multiplier: Option<f64>,
    /// One-byte tag character carried by PCF-family preambles (e.g. `T`, `K`, `-`, `<`)
    pub pcf_tag: Option<char>,
}

impl Measurement {
    /// Construct an empty measurement on the given detector
    pub fn new(detector_name: impl Into<String>) -> Self {
        Self {
            gamma_counts: Vec::new(),
            neutron_counts: Vec::new(),
            contained_neutron: false,
            energy_calibration: SharedCalibration::default(),
            live_time: Duration::ZERO,
            real_time: Duration::ZERO,
            start_time: None,
            sample_number: 0,
            detector_name: detector_name.into(),
            detector_description: None,
            source_type: SourceType::default(),
            occupancy: OccupancyStatus::default(),
            speed: None,
            gps: None,
            title: None,
            remarks: Vec::new(),
            parse_warnings: Vec::new(),
            neutron_counts_per_second_multiplier: None,
            pcf_tag: None,
        }
    }

    /// Total gamma counts across all channels
    pub fn gamma_sum(&self) -> f64 {
        self.gamma_counts.iter().sum()
    }

    /// Total neutron counts
    pub fn neutron_sum(&self) -> f64 {
        self.neutron_counts.iter().sum()
    }

    /// `true` if this measurement carries no gamma or neutron data
    pub fn is_empty(&self) -> bool {
        self.gamma_counts.is_empty() && self.neutron_counts.is_empty()
    }

    /// Verify a declared sum against the computed channel sum, within
    /// `epsilon` relative tolerance
    pub fn check_channel_sum(declared: f64, counts: &[f64], epsilon: f64) -> Result<()> {
        let computed: f64 = counts.iter().sum();
        let scale = declared.abs().max(computed.abs()).max(1.0);
        if (declared - computed).abs() / scale > epsilon {
            return Err(Error::ChannelSumMismatch { declared, computed });
        }
        Ok(())
    }

    /// Energy, keV, at the start of gamma channel `channel`
    pub fn energy_for_channel(&self, channel: f64) -> f64 {
        self.energy_calibration.energy_for_channel(channel)
    }

    /// Fractional gamma channel whose energy is `energy`
    pub fn channel_for_energy(&self, energy: f64) -> f64 {
        self.energy_calibration
            .channel_for_energy(energy, self.gamma_counts.len() as u32)
    }

    /// `live_time <= real_time` within a small tolerance for floating-point
    /// round trips through on-disk formats
    pub fn has_consistent_times(&self) -> bool {
        let tolerance = Duration::from_micros(1);
        self.real_time + tolerance >= self.live_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gps_rejects_out_of_range_coordinates() {
        assert!(GpsCoordinate::new(91.0, 0.0).is_err());
        assert!(GpsCoordinate::new(0.0, -181.0).is_err());
        assert!(GpsCoordinate::new(45.0, 45.0).is_ok());
    }

    #[test]
    fn channel_sum_mismatch_detected() {
        let counts = vec![1.0, 2.0, 3.0];
        assert!(Measurement::check_channel_sum(6.0, &counts, 1e-6).is_ok());
        assert!(Measurement::check_channel_sum(100.0, &counts, 1e-6).is_err());
    }

    #[test]
    fn time_consistency_flags_inverted_durations() {
        let mut m = Measurement::new("Aa1");
        m.real_time = Duration::from_secs(10);
        m.live_time = Duration::from_secs(9);
        assert!(m.has_consistent_times());
        m.live_time = Duration::from_secs(11);
        assert!(!m.has_consistent_times());
    }
}
