//! Channel-to-energy mapping

use crate::error::{Error, Result};
use std::sync::Arc;

/// A single deviation-pair correction point
///
/// Deviation pairs nudge a polynomial or full-range-fraction calibration at
/// specific energies, typically to correct for non-linearity near the low
/// end of a detector's range. The offset at an arbitrary energy is obtained
/// by linear interpolation between the two bracketing pairs (clamped to the
/// nearest pair outside the table's range).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviationPair {
    /// Energy of the correction point, keV
    pub energy: f64,
    /// Offset to apply at this energy, keV
    pub offset: f64,
}

impl DeviationPair {
    /// Construct a new deviation pair
    pub fn new(energy: f64, offset: f64) -> Self {
        Self { energy, offset }
    }
}

/// Linear interpolation of the deviation-pair offset at `energy`
///
/// Pairs are assumed to be provided in ascending energy order. Values
/// outside the table clamp to the offset of the nearest endpoint.
fn interpolate_deviation(pairs: &[DeviationPair], energy: f64) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }

    if energy <= pairs[0].energy {
        return pairs[0].offset;
    }

    if energy >= pairs[pairs.len() - 1].energy {
        return pairs[pairs.len() - 1].offset;
    }

    for window in pairs.windows(2) {
        let (lo, hi) = (window[0], window[1]);
        if energy >= lo.energy && energy <= hi.energy {
            if (hi.energy - lo.energy).abs() < f64::EPSILON {
                return lo.offset;
            }
            let frac = (energy - lo.energy) / (hi.energy - lo.energy);
            return lo.offset + frac * (hi.offset - lo.offset);
        }
    }

    // Should be unreachable given the bounds checks above
    0.0
}

fn pairs_sorted(pairs: &[DeviationPair]) -> bool {
    pairs.windows(2).all(|w| w[0].energy <= w[1].energy)
}

/// Immutable value describing a channel-to-energy mapping
///
/// Multiple [Measurement](crate::Measurement) instances commonly share one
/// `EnergyCalibration` - deduplicating identical calibrations during
/// [SpecFile::cleanup_after_load](crate::SpecFile::cleanup_after_load) is a
/// performance concern, not a correctness one, so sharing is via [Arc]
/// rather than required by the type itself.
///
/// Once constructed, a calibration is never mutated; producing a different
/// mapping means constructing a new value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnergyCalibration {
    /// `E = sum(c_k * i^k) + deviation(E0)`, channel `i` in `[0, n_channels)`
    Polynomial {
        /// Polynomial coefficients, lowest order first
        coefficients: Vec<f64>,
        /// Non-linearity correction points
        deviation_pairs: Vec<DeviationPair>,
        /// Declared number of channels this calibration applies to
        n_channels: u32,
    },
    /// `x = i/N`, `E = sum(c_k * x^k)`, with an optional low-energy term
    /// `c4 / (1 + 60x)` folded into the fourth coefficient slot when present
    FullRangeFraction {
        /// Full-range-fraction coefficients, lowest order first
        coefficients: Vec<f64>,
        /// Non-linearity correction points
        deviation_pairs: Vec<DeviationPair>,
        /// Declared number of channels this calibration applies to
        n_channels: u32,
    },
    /// Explicit lower edge energy for every channel
    LowerChannelEdge {
        /// Lower-edge energy for each channel, ascending
        edges: Vec<f64>,
    },
    /// Calibration is known to be absent or unusable
    Invalid,
    /// No calibration was given by the source file; channel number doubles
    /// as a stand-in energy
    UnspecifiedDefaultPolynomial,
}

impl Default for EnergyCalibration {
    fn default() -> Self {
        EnergyCalibration::Invalid
    }
}

impl EnergyCalibration {
    /// Construct and validate a polynomial calibration
    ///
    /// Validity requires: the first coefficient is finite, the linear term
    /// is strictly positive, and the resulting energy sequence over
    /// `[0, n_channels]` is strictly monotonic.
    pub fn polynomial(
        coefficients: Vec<f64>,
        deviation_pairs: Vec<DeviationPair>,
        n_channels: u32,
    ) -> Result<Self> {
        if !pairs_sorted(&deviation_pairs) {
            return Err(Error::UnsortedDeviationPairs);
        }

        let cal = EnergyCalibration::Polynomial {
            coefficients,
            deviation_pairs,
            n_channels,
        };
        cal.validate()?;
        Ok(cal)
    }

    /// Construct and validate a full-range-fraction calibration
    pub fn full_range_fraction(
        coefficients: Vec<f64>,
        deviation_pairs: Vec<DeviationPair>,
        n_channels: u32,
    ) -> Result<Self> {
        if !pairs_sorted(&deviation_pairs) {
            return Err(Error::UnsortedDeviationPairs);
        }

        let cal = EnergyCalibration::FullRangeFraction {
            coefficients,
            deviation_pairs,
            n_channels,
        };
        cal.validate()?;
        Ok(cal)
    }

    /// Construct a lower-channel-edge calibration from ascending edges
    pub fn lower_channel_edge(edges: Vec<f64>) -> Result<Self> {
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidCalibration(
                "lower channel edges are not strictly increasing".into(),
            ));
        }
        Ok(EnergyCalibration::LowerChannelEdge { edges })
    }

    /// Declared channel count, where known
    ///
    /// `LowerChannelEdge`, `Invalid`, and `UnspecifiedDefaultPolynomial`
    /// variants have no fixed declared count and return `None`.
    pub fn declared_n_channels(&self) -> Option<u32> {
        match self {
            EnergyCalibration::Polynomial { n_channels, .. }
            | EnergyCalibration::FullRangeFraction { n_channels, .. } => Some(*n_channels),
            EnergyCalibration::LowerChannelEdge { edges } => Some(edges.len() as u32),
            EnergyCalibration::Invalid | EnergyCalibration::UnspecifiedDefaultPolynomial => None,
        }
    }

    /// Energy, keV, at the start of channel `channel`
    pub fn energy_for_channel(&self, channel: f64) -> f64 {
        match self {
            EnergyCalibration::Polynomial {
                coefficients,
                deviation_pairs,
                ..
            } => {
                let base = horner(coefficients, channel);
                base + interpolate_deviation(deviation_pairs, base)
            }
            EnergyCalibration::FullRangeFraction {
                coefficients,
                deviation_pairs,
                n_channels,
            } => {
                let x = channel / (*n_channels).max(1) as f64;
                let mut base = horner(coefficients, x);
                if let Some(c4) = coefficients.get(4) {
                    base += c4 / (1.0 + 60.0 * x);
                }
                base + interpolate_deviation(deviation_pairs, base)
            }
            EnergyCalibration::LowerChannelEdge { edges } => {
                let idx = channel.floor().clamp(0.0, (edges.len() - 1) as f64) as usize;
                edges[idx]
            }
            EnergyCalibration::Invalid | EnergyCalibration::UnspecifiedDefaultPolynomial => {
                channel
            }
        }
    }

    /// Full set of channel-boundary energies for `n` channels (`n+1` edges)
    pub fn channel_energies(&self, n: u32) -> Vec<f64> {
        (0..=n).map(|i| self.energy_for_channel(i as f64)).collect()
    }

    /// Inverse of [`energy_for_channel`](Self::energy_for_channel): finds the
    /// fractional channel whose energy is `energy`, by bisection over a
    /// monotonic sequence of `n_channels` boundaries.
    pub fn channel_for_energy(&self, energy: f64, n_channels: u32) -> f64 {
        let edges = self.channel_energies(n_channels);
        if edges.len() < 2 {
            return 0.0;
        }

        if energy <= edges[0] {
            return 0.0;
        }
        if energy >= edges[edges.len() - 1] {
            return (edges.len() - 1) as f64;
        }

        for (i, w) in edges.windows(2).enumerate() {
            if energy >= w[0] && energy <= w[1] {
                let frac = if (w[1] - w[0]).abs() < f64::EPSILON {
                    0.0
                } else {
                    (energy - w[0]) / (w[1] - w[0])
                };
                return i as f64 + frac;
            }
        }
        (edges.len() - 1) as f64
    }

    /// Convert a polynomial calibration to the equivalent full-range-fraction
    /// form over `n_channels`
    ///
    /// `c_k' = c_k * n_channels^k`. Deviation pairs carry across unchanged
    /// since they are indexed by energy, not channel.
    pub fn to_full_range_fraction(&self, n_channels: u32) -> Result<EnergyCalibration> {
        match self {
            EnergyCalibration::Polynomial {
                coefficients,
                deviation_pairs,
                ..
            } => {
                let n = n_channels.max(1) as f64;
                let coefficients = coefficients
                    .iter()
                    .enumerate()
                    .map(|(k, c)| c * n.powi(k as i32))
                    .collect();
                EnergyCalibration::full_range_fraction(
                    coefficients,
                    deviation_pairs.clone(),
                    n_channels,
                )
            }
            _ => Err(Error::InvalidCalibration(
                "only polynomial calibrations convert to full-range-fraction".into(),
            )),
        }
    }

    /// Convert a full-range-fraction calibration back to polynomial form
    pub fn from_full_range_fraction(&self) -> Result<EnergyCalibration> {
        match self {
            EnergyCalibration::FullRangeFraction {
                coefficients,
                deviation_pairs,
                n_channels,
            } => {
                let n = (*n_channels).max(1) as f64;
                let coefficients = coefficients
                    .iter()
                    .enumerate()
                    .map(|(k, c)| c / n.powi(k as i32))
                    .collect();
                EnergyCalibration::polynomial(coefficients, deviation_pairs.clone(), *n_channels)
            }
            _ => Err(Error::InvalidCalibration(
                "only full-range-fraction calibrations convert to polynomial".into(),
            )),
        }
    }

    /// Check the validity invariant: finite leading coefficient, strictly
    /// positive slope, strictly monotonic energy sequence
    pub fn validate(&self) -> Result<()> {
        let (coefficients, n_channels) = match self {
            EnergyCalibration::Polynomial {
                coefficients,
                n_channels,
                ..
            }
            | EnergyCalibration::FullRangeFraction {
                coefficients,
                n_channels,
                ..
            } => (coefficients, *n_channels),
            _ => return Ok(()),
        };

        let Some(first) = coefficients.first() else {
            return Err(Error::InvalidCalibration("no coefficients given".into()));
        };

        if !first.is_finite() {
            return Err(Error::InvalidCalibration(
                "leading coefficient is not finite".into(),
            ));
        }

        let slope = coefficients.get(1).copied().unwrap_or(0.0);
        if slope <= 0.0 {
            return Err(Error::InvalidCalibration(
                "calibration slope must be strictly positive".into(),
            ));
        }

        let edges = self.channel_energies(n_channels.max(1));
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidCalibration(
                "calibration is not strictly monotonic over its channel range".into(),
            ));
        }

        Ok(())
    }

    /// True if this calibration describes a usable channel-to-energy mapping
    pub fn is_valid(&self) -> bool {
        !matches!(
            self,
            EnergyCalibration::Invalid | EnergyCalibration::UnspecifiedDefaultPolynomial
        )
    }
}

/// Evaluate `sum(c_k * x^k)` via Horner's method
fn horner(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Reference-counted handle for sharing one calibration across many
/// [Measurement](crate::Measurement) instances without cloning it
pub type SharedCalibration = Arc<EnergyCalibration>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polynomial_energy_is_linear_without_deviation() {
        let cal = EnergyCalibration::polynomial(vec![0.0, 3.0], vec![], 128).unwrap();
        assert_eq!(cal.energy_for_channel(0.0), 0.0);
        assert_eq!(cal.energy_for_channel(10.0), 30.0);
    }

    #[test]
    fn rejects_non_positive_slope() {
        let err = EnergyCalibration::polynomial(vec![0.0, 0.0], vec![], 128);
        assert!(err.is_err());
    }

    #[test]
    fn deviation_pairs_interpolate_linearly() {
        let pairs = vec![DeviationPair::new(0.0, 0.0), DeviationPair::new(100.0, 10.0)];
        assert_eq!(interpolate_deviation(&pairs, 50.0), 5.0);
        assert_eq!(interpolate_deviation(&pairs, -10.0), 0.0);
        assert_eq!(interpolate_deviation(&pairs, 200.0), 10.0);
    }

    #[test]
    fn frf_round_trips_through_polynomial() {
        let cal = EnergyCalibration::polynomial(vec![1.0, 3.0, 0.01], vec![], 128).unwrap();
        let frf = cal.to_full_range_fraction(128).unwrap();
        let back = frf.from_full_range_fraction().unwrap();
        match (&cal, &back) {
            (
                EnergyCalibration::Polynomial { coefficients: a, .. },
                EnergyCalibration::Polynomial { coefficients: b, .. },
            ) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    assert!((x - y).abs() < 1e-9);
                }
            }
            _ => panic!("expected polynomial variants"),
        }
    }

    #[test]
    fn channel_for_energy_is_inverse_of_energy_for_channel() {
        let cal = EnergyCalibration::polynomial(vec![0.0, 3.0], vec![], 128).unwrap();
        let e = cal.energy_for_channel(42.0);
        let c = cal.channel_for_energy(e, 128);
        assert!((c - 42.0).abs() < 1e-6);
    }
}
