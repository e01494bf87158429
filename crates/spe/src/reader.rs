//! Tag-driven reader for IAEA SPE spectrum files

use crate::error::{Error, Result};
use log::{debug, warn};
use specio_core::{
    DetectorAnalysis, DetectorAnalysisResult, DeviationPair, EnergyCalibration, GpsCoordinate,
    Instant, Measurement, SpecFile,
};
use specio_text::{split_to_floats, time_from_string, DateOrder, LineReader, SplitOptions};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// A line-at-a-time reader with one line of lookahead, so a block reader can
/// stop as soon as it sees the next `$TAG:` line without consuming it
struct TagReader<R> {
    lines: LineReader<R>,
    pushed_back: Option<String>,
}

impl<R: Read> TagReader<R> {
    fn new(inner: R) -> Self {
        Self {
            lines: LineReader::new(inner),
            pushed_back: None,
        }
    }

    fn next_line(&mut self) -> Option<String> {
        if let Some(line) = self.pushed_back.take() {
            return Some(line);
        }
        if self.lines.is_eof() {
            return None;
        }
        let line = self.lines.read_line(None);
        if self.lines.is_eof() && line.is_empty() {
            return None;
        }
        Some(line)
    }

    /// Read lines into `sink` until one looks like a `$TAG:` line, which is
    /// pushed back for the next call to [`Self::next_tag`]
    fn collect_block(&mut self, sink: &mut Vec<String>) {
        while let Some(line) = self.next_line() {
            if parse_tag(&line).is_some() {
                self.pushed_back = Some(line);
                return;
            }
            sink.push(line);
        }
    }

    /// Advance to (and return) the next `$TAG:` line, discarding any
    /// non-tag lines in between
    fn next_tag(&mut self) -> Option<String> {
        loop {
            let line = self.next_line()?;
            if parse_tag(&line).is_some() {
                return Some(line);
            }
        }
    }
}

fn parse_tag(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line.strip_prefix('$')?;
    rest.strip_suffix(':')
}

fn floats_in(line: &str) -> Vec<f64> {
    split_to_floats(line, SplitOptions::default())
}

fn strip_kev_suffix(line: &str) -> &str {
    line.trim().trim_end_matches("keV").trim_end_matches("KEV").trim()
}

#[derive(Default)]
struct Pending {
    gamma_counts: Vec<f64>,
    live_time: f64,
    real_time: f64,
    title: Option<String>,
    ener_fit: Option<Vec<f64>>,
    mca_cal: Option<Vec<f64>>,
    deviation_pairs: Vec<DeviationPair>,
    start_time: Option<Instant>,
    gps: Option<(f64, f64)>,
    neutron_sum: Option<f64>,
    neutron_is_cps: bool,
    device_id: Option<String>,
}

impl Pending {
    fn calibration(&self, n_channels: u32) -> EnergyCalibration {
        let Some(coefficients) = self.mca_cal.clone().or_else(|| self.ener_fit.clone()) else {
            return EnergyCalibration::UnspecifiedDefaultPolynomial;
        };
        EnergyCalibration::polynomial(coefficients, self.deviation_pairs.clone(), n_channels)
            .unwrap_or(EnergyCalibration::Invalid)
    }

    fn into_measurement(self) -> Measurement {
        let n_channels = self.gamma_counts.len() as u32;
        let calibration = self.calibration(n_channels);

        let mut measurement = Measurement::new(self.device_id.unwrap_or_default());
        measurement.gamma_counts = self.gamma_counts;
        measurement.energy_calibration = Arc::new(calibration);
        measurement.live_time = Duration::from_secs_f64(self.live_time.max(0.0));
        measurement.real_time = Duration::from_secs_f64(self.real_time.max(0.0));
        measurement.start_time = self.start_time;
        measurement.title = self.title;

        if let Some(value) = self.neutron_sum {
            measurement.contained_neutron = true;
            if self.neutron_is_cps {
                let real_secs = measurement.real_time.as_secs_f64();
                if real_secs == 0.0 {
                    let warning =
                        "NEUTRON_CPS given but real_time is zero; neutron counts left in counts-per-second".to_string();
                    warn!("{warning}");
                    measurement.parse_warnings.push(warning);
                    measurement.neutron_counts = vec![value];
                } else {
                    measurement.neutron_counts = vec![value * real_secs];
                    measurement.neutron_counts_per_second_multiplier = Some(real_secs);
                }
            } else {
                measurement.neutron_counts = vec![value];
            }
        }

        if let Some((lat, lon)) = self.gps {
            measurement.gps = GpsCoordinate::new(lat, lon).ok();
        }

        measurement
    }
}

fn parse_data_block(reader: &mut TagReader<impl Read>, pending: &mut Pending) {
    let mut lines = Vec::new();
    reader.collect_block(&mut lines);
    let mut lines = lines.into_iter();

    let bounds = lines.next().map(|l| floats_in(&l)).unwrap_or_default();
    let first_channel = bounds.first().copied().unwrap_or(0.0) as i64;
    let last_channel = bounds.get(1).copied().unwrap_or(0.0) as i64;
    let expected = (last_channel - first_channel + 1).max(0) as usize;

    let mut counts = Vec::with_capacity(expected);
    for line in lines {
        counts.extend(floats_in(&line));
    }
    pending.gamma_counts = counts;
}

fn parse_non_linear_deviations(reader: &mut TagReader<impl Read>) -> Vec<DeviationPair> {
    let mut lines = Vec::new();
    reader.collect_block(&mut lines);
    let mut lines = lines.into_iter();

    let n: usize = lines.next().and_then(|l| l.trim().parse().ok()).unwrap_or(0);
    lines
        .take(n)
        .filter_map(|line| {
            let values = floats_in(&line);
            (values.len() >= 2).then(|| DeviationPair::new(values[0], values[1]))
        })
        .collect()
}

/// Parse one `$RADIONUCLIDES:` token, e.g. `Cs137*[9.58755]`: a nuclide
/// name followed by an optional `*[confidence]` suffix
fn parse_radionuclide_token(token: &str) -> Option<DetectorAnalysisResult> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let (nuclide, id_confidence) = match token.split_once('*') {
        Some((name, rest)) => {
            let confidence = rest.trim().trim_start_matches('[').trim_end_matches(']').trim();
            (name.trim(), (!confidence.is_empty()).then(|| confidence.to_string()))
        }
        None => (token, None),
    };
    if nuclide.is_empty() {
        return None;
    }
    Some(DetectorAnalysisResult {
        nuclide: nuclide.to_string(),
        nuclide_type: None,
        id_confidence,
        dose_rate: None,
        remark: None,
    })
}

fn parse_radionuclides(reader: &mut TagReader<impl Read>) -> Vec<DetectorAnalysisResult> {
    let mut lines = Vec::new();
    reader.collect_block(&mut lines);
    lines
        .iter()
        .flat_map(|line| line.split_whitespace())
        .filter_map(parse_radionuclide_token)
        .collect()
}

fn parse_dose_rate(reader: &mut TagReader<impl Read>) -> Option<DetectorAnalysisResult> {
    let mut lines = Vec::new();
    reader.collect_block(&mut lines);
    let dose_rate = lines.first().and_then(|l| floats_in(l).first().copied())?;
    Some(DetectorAnalysisResult {
        nuclide: String::new(),
        nuclide_type: None,
        id_confidence: None,
        dose_rate: Some(dose_rate),
        remark: Some("DOSE_RATE".into()),
    })
}

/// Parse a complete IAEA SPE document from a byte stream into `file`
///
/// On failure `file` may already hold measurements committed by earlier
/// `$ENDRECORD:` markers in the stream; callers that need all-or-nothing
/// semantics should parse into a fresh [`SpecFile`] and discard it on error.
pub fn read_spe<R: Read>(source: R, file: &SpecFile) -> Result<()> {
    let mut reader = TagReader::new(source);
    let mut pending = Pending::default();
    let mut analysis_results = Vec::new();
    let mut committed = 0usize;

    while let Some(tag_line) = reader.next_tag() {
        let tag = parse_tag(&tag_line).expect("next_tag only returns tag lines");

        match tag {
            "SPEC_ID" => pending.title = reader.next_line(),
            "DEVICE_ID" | "DETECTOR_ID" => pending.device_id = reader.next_line(),
            "MEAS_TIM" => {
                let values = reader.next_line().map(|l| floats_in(&l)).unwrap_or_default();
                pending.live_time = values.first().copied().unwrap_or(0.0);
                pending.real_time = values.get(1).copied().unwrap_or(pending.live_time);
            }
            "DATE_MEA" => {
                let date_line = reader.next_line().unwrap_or_default();
                pending.start_time = time_from_string(&date_line, DateOrder::MiddleEndianFirst);
                if pending.start_time.is_none() {
                    warn!("DATE_MEA line did not parse as a timestamp: {date_line:?}");
                }
            }
            "ENER_FIT" => {
                let line = reader.next_line().unwrap_or_default();
                pending.ener_fit = Some(floats_in(strip_kev_suffix(&line)));
            }
            "MCA_CAL" => {
                let declared: usize = reader.next_line().and_then(|l| l.trim().parse().ok()).unwrap_or(0);
                let line = reader.next_line().unwrap_or_default();
                let coeffs = floats_in(strip_kev_suffix(&line));
                if declared != 0 && coeffs.len() != declared {
                    debug!("MCA_CAL declared {declared} coefficients but found {}", coeffs.len());
                }
                pending.mca_cal = Some(coeffs);
            }
            "NON_LINEAR_DEVIATIONS" => pending.deviation_pairs = parse_non_linear_deviations(&mut reader),
            "GPS" => {
                let values = reader.next_line().map(|l| floats_in(&l)).unwrap_or_default();
                if values.len() >= 2 {
                    pending.gps = Some((values[0], values[1]));
                }
            }
            "NEUTRONS" => {
                pending.neutron_sum = reader.next_line().and_then(|l| floats_in(&l).first().copied());
                pending.neutron_is_cps = false;
            }
            "NEUTRON_CPS" => {
                pending.neutron_sum = reader.next_line().and_then(|l| floats_in(&l).first().copied());
                pending.neutron_is_cps = true;
            }
            "RADIONUCLIDES" => analysis_results.extend(parse_radionuclides(&mut reader)),
            "DOSE_RATE" => analysis_results.extend(parse_dose_rate(&mut reader)),
            "DATA" => parse_data_block(&mut reader, &mut pending),
            "ENDRECORD" => {
                if pending.gamma_counts.is_empty() {
                    warn!("ENDRECORD with no $DATA: block, skipping");
                } else {
                    file.push_measurement(std::mem::take(&mut pending).into_measurement());
                    committed += 1;
                }
                pending = Pending::default();
            }
            "IDENTIFY_PARAMETER" | "ROI_INFO" => {
                let mut discard = Vec::new();
                reader.collect_block(&mut discard);
            }
            other => {
                debug!("skipping unrecognized SPE tag ${other}:");
                let mut discard = Vec::new();
                reader.collect_block(&mut discard);
            }
        }
    }

    if !pending.gamma_counts.is_empty() {
        file.push_measurement(pending.into_measurement());
        committed += 1;
    }

    if committed == 0 {
        return Err(Error::NoMeasurements);
    }

    if !analysis_results.is_empty() {
        file.set_analysis(DetectorAnalysis {
            algorithm_name: None,
            results: analysis_results,
        });
    }

    file.cleanup_after_load()?;
    Ok(())
}
