//! The top-level container for a parsed spectrum file

use crate::calibration::SharedCalibration;
use crate::error::{Error, Result};
use crate::measurement::Measurement;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Broad category of detection medium, carried through from the source file
/// when it says so and left as `Unknown` otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DetectorType {
    /// NaI(Tl) scintillator
    NaI,
    /// High-purity germanium
    HPGe,
    /// Cadmium zinc telluride
    CZT,
    /// Unknown or unspecified
    #[default]
    Unknown,
}

/// One nuclide identification result carried verbatim from a source file's
/// embedded analysis results block, without any reinterpretation
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorAnalysisResult {
    /// Nuclide name as given by the source file, empty for a result that
    /// only carries a dose rate
    pub nuclide: String,
    /// Category the source file placed this result under (e.g. `"Found"`,
    /// `"Suspect"`, `"NORM"`)
    pub nuclide_type: Option<String>,
    /// Confidence value as given by the source file, unparsed beyond
    /// whitespace trimming
    pub id_confidence: Option<String>,
    /// Dose rate associated with this result, source file's declared units
    pub dose_rate: Option<f64>,
    /// Free-text remark attached to this result
    pub remark: Option<String>,
}

/// An analysis-results block passed through from the source file verbatim
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorAnalysis {
    /// Algorithm name, if given
    pub algorithm_name: Option<String>,
    /// Individual identification results
    pub results: Vec<DetectorAnalysisResult>,
}

/// A fully parsed spectrum file: its measurements, detector metadata, and
/// analysis results
///
/// `SpecFile` wraps its mutable state in a [`parking_lot::ReentrantMutex`]
/// so that a method may call another `&self` method on the same file
/// (e.g. [`cleanup_after_load`](Self::cleanup_after_load) calling
/// [`sum_measurements`](Self::sum_measurements)) without deadlocking, which
/// is not possible with a plain `Mutex`.
#[derive(Debug)]
pub struct SpecFile {
    inner: ReentrantMutex<RefCell<SpecFileState>>,
}

#[derive(Debug, Default, Clone)]
struct SpecFileState {
    measurements: Vec<Measurement>,
    detector_type: DetectorType,
    instrument_id: Option<String>,
    title: Option<String>,
    remarks: Vec<String>,
    analysis: Option<DetectorAnalysis>,
    filename: Option<String>,
    /// First-occurrence index of each detector name, filled by
    /// `cleanup_after_load`
    detector_numbers: HashMap<String, i32>,
    /// Distinct sample numbers across the measurement list, filled by
    /// `cleanup_after_load`
    sample_numbers: Vec<i32>,
}

impl Default for SpecFile {
    fn default() -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(SpecFileState::default())),
        }
    }
}

impl SpecFile {
    /// Construct an empty spectrum file container
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of measurements currently held
    pub fn len(&self) -> usize {
        self.inner.lock().borrow().measurements.len()
    }

    /// `true` if no measurements have been added
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a measurement, renumbering its `sample_number` if it collides
    /// with one already present on the same detector
    pub fn push_measurement(&self, mut measurement: Measurement) {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        let collides = state.measurements.iter().any(|m| {
            m.detector_name == measurement.detector_name
                && m.sample_number == measurement.sample_number
        });
        if collides {
            let next = state
                .measurements
                .iter()
                .filter(|m| m.detector_name == measurement.detector_name)
                .map(|m| m.sample_number)
                .max()
                .unwrap_or(0)
                + 1;
            measurement.sample_number = next;
        }
        state.measurements.push(measurement);
    }

    /// Clone of every measurement currently held
    pub fn measurements(&self) -> Vec<Measurement> {
        self.inner.lock().borrow().measurements.clone()
    }

    /// Set the declared detector type
    pub fn set_detector_type(&self, kind: DetectorType) {
        self.inner.lock().borrow_mut().detector_type = kind;
    }

    /// Declared detector type
    pub fn detector_type(&self) -> DetectorType {
        self.inner.lock().borrow().detector_type
    }

    /// Set the source filename, used by the dispatcher for format hinting
    pub fn set_filename(&self, filename: impl Into<String>) {
        self.inner.lock().borrow_mut().filename = Some(filename.into());
    }

    /// Source filename, if known
    pub fn filename(&self) -> Option<String> {
        self.inner.lock().borrow().filename.clone()
    }

    /// Set the instrument identifier string
    pub fn set_instrument_id(&self, id: impl Into<String>) {
        self.inner.lock().borrow_mut().instrument_id = Some(id.into());
    }

    /// Instrument identifier, if known
    pub fn instrument_id(&self) -> Option<String> {
        self.inner.lock().borrow().instrument_id.clone()
    }

    /// Set the file-level title or description
    pub fn set_title(&self, title: impl Into<String>) {
        self.inner.lock().borrow_mut().title = Some(title.into());
    }

    /// File-level title, if known
    pub fn title(&self) -> Option<String> {
        self.inner.lock().borrow().title.clone()
    }

    /// Append a free-text remark line
    pub fn add_remark(&self, remark: impl Into<String>) {
        self.inner.lock().borrow_mut().remarks.push(remark.into());
    }

    /// Replace the remarks list wholesale
    pub fn set_remarks(&self, remarks: Vec<String>) {
        self.inner.lock().borrow_mut().remarks = remarks;
    }

    /// All free-text remark lines
    pub fn remarks(&self) -> Vec<String> {
        self.inner.lock().borrow().remarks.clone()
    }

    /// Attach an analysis-results block
    pub fn set_analysis(&self, analysis: DetectorAnalysis) {
        self.inner.lock().borrow_mut().analysis = Some(analysis);
    }

    /// Attached analysis-results block, if any
    pub fn analysis(&self) -> Option<DetectorAnalysis> {
        self.inner.lock().borrow().analysis.clone()
    }

    /// Normalize the file after a format reader has finished populating it
    ///
    /// Deduplicates identical energy calibrations across measurements
    /// (hash-consing them behind one [`Arc`]), validates GPS/time/channel
    /// invariants measurement-by-measurement, and logs (but does not fail
    /// on) recoverable oddities.
    pub fn cleanup_after_load(&self) -> Result<()> {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();

        let mut pool: Vec<SharedCalibration> = Vec::new();
        for measurement in state.measurements.iter_mut() {
            if !measurement.energy_calibration.is_valid()
                && !measurement.gamma_counts.is_empty()
            {
                log::debug!(
                    "measurement on detector {:?} has no usable energy calibration",
                    measurement.detector_name
                );
            }

            if let Some(existing) = pool
                .iter()
                .find(|c| c.as_ref() == measurement.energy_calibration.as_ref())
            {
                measurement.energy_calibration = Arc::clone(existing);
            } else {
                pool.push(Arc::clone(&measurement.energy_calibration));
            }

            if measurement.live_time.is_zero() && !measurement.real_time.is_zero() {
                measurement.live_time = measurement.real_time;
                let warning = format!(
                    "live_time missing on detector {:?} sample {}, set equal to real_time",
                    measurement.detector_name, measurement.sample_number
                );
                log::warn!("{warning}");
                measurement.parse_warnings.push(warning);
            } else if measurement.real_time.is_zero() && !measurement.live_time.is_zero() {
                measurement.real_time = measurement.live_time;
                let warning = format!(
                    "real_time missing on detector {:?} sample {}, set equal to live_time",
                    measurement.detector_name, measurement.sample_number
                );
                log::warn!("{warning}");
                measurement.parse_warnings.push(warning);
            } else if !measurement.has_consistent_times() {
                log::warn!(
                    "live_time exceeds real_time on detector {:?}, sample {}",
                    measurement.detector_name,
                    measurement.sample_number
                );
            }

            if measurement.contained_neutron && measurement.neutron_counts.is_empty() {
                measurement.neutron_counts = vec![measurement.neutron_sum()];
            }

            if let Some(gps) = measurement.gps {
                if gps.is_null_island() {
                    log::debug!("dropping null-island GPS fix on sample {}", measurement.sample_number);
                    measurement.gps = None;
                }
            }
        }

        let mut seen: HashMap<(String, i32), ()> = HashMap::new();
        for measurement in state.measurements.iter_mut() {
            let mut key = (measurement.detector_name.clone(), measurement.sample_number);
            if seen.contains_key(&key) {
                let mut candidate = measurement.sample_number;
                loop {
                    candidate += 1;
                    let next_key = (measurement.detector_name.clone(), candidate);
                    if !seen.contains_key(&next_key) {
                        measurement.sample_number = candidate;
                        key = next_key;
                        break;
                    }
                }
            }
            seen.insert(key, ());
        }

        let mut detector_numbers: HashMap<String, i32> = HashMap::new();
        for measurement in state.measurements.iter() {
            let next = detector_numbers.len() as i32;
            detector_numbers.entry(measurement.detector_name.clone()).or_insert(next);
        }
        let mut sample_numbers: Vec<i32> = state.measurements.iter().map(|m| m.sample_number).collect();
        sample_numbers.sort_unstable();
        sample_numbers.dedup();
        state.detector_numbers = detector_numbers;
        state.sample_numbers = sample_numbers;

        Ok(())
    }

    /// Sum every measurement matching `detector_name` (or all detectors, if
    /// `None`) into a single synthetic measurement
    ///
    /// All summed measurements must share an identical energy calibration;
    /// channel-wise counts and live/real times are added.
    pub fn sum_measurements(&self, detector_name: Option<&str>) -> Result<Measurement> {
        let guard = self.inner.lock();
        let state = guard.borrow();

        let selected: Vec<&Measurement> = state
            .measurements
            .iter()
            .filter(|m| detector_name.map(|name| m.detector_name == name).unwrap_or(true))
            .collect();

        let first = selected.first().ok_or(Error::EmptySumSelection)?;

        if selected
            .iter()
            .any(|m| m.energy_calibration.as_ref() != first.energy_calibration.as_ref())
        {
            return Err(Error::MismatchedCalibrationsInSum);
        }

        let mut summed = Measurement::new(first.detector_name.clone());
        summed.energy_calibration = Arc::clone(&first.energy_calibration);
        summed.source_type = first.source_type;

        let max_gamma = selected.iter().map(|m| m.gamma_counts.len()).max().unwrap_or(0);
        let mut gamma = vec![0.0; max_gamma];
        let max_neutron = selected.iter().map(|m| m.neutron_counts.len()).max().unwrap_or(0);
        let mut neutron = vec![0.0; max_neutron];

        for m in &selected {
            for (i, c) in m.gamma_counts.iter().enumerate() {
                gamma[i] += c;
            }
            for (i, c) in m.neutron_counts.iter().enumerate() {
                neutron[i] += c;
            }
            summed.live_time += m.live_time;
            summed.real_time += m.real_time;
            if let Some(start) = m.start_time {
                summed.start_time = Some(match summed.start_time {
                    Some(earliest) if earliest <= start => earliest,
                    _ => start,
                });
            }
        }

        summed.gamma_counts = gamma;
        summed.neutron_counts = neutron;
        summed.contained_neutron = selected.iter().any(|m| m.contained_neutron);
        summed.sample_number = -1;
        summed.title = Some("Sum".into());

        Ok(summed)
    }

    /// Detector names that appear across the held measurements, in first
    /// occurrence order
    pub fn detector_names(&self) -> Vec<String> {
        let guard = self.inner.lock();
        let state = guard.borrow();
        let mut seen: HashMap<&str, ()> = HashMap::new();
        let mut names = Vec::new();
        for m in &state.measurements {
            if seen.insert(m.detector_name.as_str(), ()).is_none() {
                names.push(m.detector_name.clone());
            }
        }
        names
    }

    /// First-occurrence index of each detector name, as filled in by the
    /// last [`cleanup_after_load`](Self::cleanup_after_load)
    pub fn detector_numbers(&self) -> HashMap<String, i32> {
        self.inner.lock().borrow().detector_numbers.clone()
    }

    /// Distinct sample numbers across the measurement list, as filled in by
    /// the last [`cleanup_after_load`](Self::cleanup_after_load)
    pub fn sample_numbers(&self) -> Vec<i32> {
        self.inner.lock().borrow().sample_numbers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::EnergyCalibration;
    use std::time::Duration;

    fn plain_measurement(detector: &str, sample: i32, counts: Vec<f64>) -> Measurement {
        let mut m = Measurement::new(detector);
        m.sample_number = sample;
        m.gamma_counts = counts;
        m.energy_calibration =
            Arc::new(EnergyCalibration::polynomial(vec![0.0, 3.0], vec![], 1024).unwrap());
        m.real_time = Duration::from_secs(10);
        m.live_time = Duration::from_secs(9);
        m
    }

    #[test]
    fn push_renumbers_colliding_sample_numbers() {
        let file = SpecFile::new();
        file.push_measurement(plain_measurement("Aa1", 1, vec![1.0, 2.0]));
        file.push_measurement(plain_measurement("Aa1", 1, vec![3.0, 4.0]));
        let samples: Vec<i32> = file.measurements().iter().map(|m| m.sample_number).collect();
        assert_eq!(samples, vec![1, 2]);
    }

    #[test]
    fn sum_measurements_adds_channel_counts() {
        let file = SpecFile::new();
        file.push_measurement(plain_measurement("Aa1", 1, vec![1.0, 2.0]));
        file.push_measurement(plain_measurement("Aa1", 2, vec![3.0, 4.0]));
        let summed = file.sum_measurements(Some("Aa1")).unwrap();
        assert_eq!(summed.gamma_counts, vec![4.0, 6.0]);
        assert_eq!(summed.real_time, Duration::from_secs(20));
    }

    #[test]
    fn sum_measurements_rejects_mismatched_calibrations() {
        let file = SpecFile::new();
        let mut a = plain_measurement("Aa1", 1, vec![1.0]);
        a.energy_calibration =
            Arc::new(EnergyCalibration::polynomial(vec![0.0, 1.0], vec![], 1024).unwrap());
        file.push_measurement(a);
        file.push_measurement(plain_measurement("Aa1", 2, vec![1.0]));
        assert!(matches!(
            file.sum_measurements(Some("Aa1")),
            Err(Error::MismatchedCalibrationsInSum)
        ));
    }

    #[test]
    fn cleanup_after_load_shares_identical_calibrations() {
        let file = SpecFile::new();
        file.push_measurement(plain_measurement("Aa1", 1, vec![1.0]));
        file.push_measurement(plain_measurement("Aa2", 1, vec![1.0]));
        file.cleanup_after_load().unwrap();
        let measurements = file.measurements();
        assert!(Arc::ptr_eq(
            &measurements[0].energy_calibration,
            &measurements[1].energy_calibration
        ));
    }

    #[test]
    fn detector_names_preserves_first_occurrence_order() {
        let file = SpecFile::new();
        file.push_measurement(plain_measurement("Ba1", 1, vec![1.0]));
        file.push_measurement(plain_measurement("Aa1", 1, vec![1.0]));
        file.push_measurement(plain_measurement("Ba1", 2, vec![1.0]));
        assert_eq!(file.detector_names(), vec!["Ba1".to_string(), "Aa1".to_string()]);
    }

    #[test]
    fn cleanup_after_load_synthesizes_missing_live_or_real_time() {
        let file = SpecFile::new();
        let mut missing_live = plain_measurement("Aa1", 1, vec![1.0]);
        missing_live.live_time = Duration::ZERO;
        file.push_measurement(missing_live);

        let mut missing_real = plain_measurement("Aa2", 1, vec![1.0]);
        missing_real.real_time = Duration::ZERO;
        file.push_measurement(missing_real);

        file.cleanup_after_load().unwrap();
        let measurements = file.measurements();

        assert_eq!(measurements[0].live_time, measurements[0].real_time);
        assert_eq!(measurements[0].parse_warnings.len(), 1);
        assert_eq!(measurements[1].real_time, measurements[1].live_time);
        assert_eq!(measurements[1].parse_warnings.len(), 1);
    }

    #[test]
    fn cleanup_after_load_fills_neutron_sequence_from_contained_flag() {
        let file = SpecFile::new();
        let mut m = plain_measurement("Aa1", 1, vec![1.0]);
        m.contained_neutron = true;
        file.push_measurement(m);

        file.cleanup_after_load().unwrap();
        let measurements = file.measurements();
        assert_eq!(measurements[0].neutron_counts, vec![0.0]);
    }

    #[test]
    fn cleanup_after_load_fills_detector_numbers_and_sample_numbers() {
        let file = SpecFile::new();
        file.push_measurement(plain_measurement("Ba1", 5, vec![1.0]));
        file.push_measurement(plain_measurement("Aa1", 5, vec![1.0]));
        file.push_measurement(plain_measurement("Ba1", 6, vec![1.0]));

        file.cleanup_after_load().unwrap();

        let numbers = file.detector_numbers();
        assert_eq!(numbers.get("Ba1"), Some(&0));
        assert_eq!(numbers.get("Aa1"), Some(&1));
        assert_eq!(file.sample_numbers(), vec![5, 6]);
    }
}
