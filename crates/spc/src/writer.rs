//! Binary SPC writer: the inverse of [`crate::reader::read_spc`]
//!
//! SPC holds one spectrum per file; measurements are summed first if more
//! than one is present, mirroring how the format is actually produced by
//! acquisition software.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use specio_core::{EnergyCalibration, Measurement, SpecFile};
use std::io::Write;

const RECORD_LEN: usize = crate::RECORD_LEN as usize;
const DECDAY_EPOCH_YEAR: i32 = 1979;

fn push_i16(buf: &mut Vec<u8>, value: i16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_f32(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_padded(buf: &mut Vec<u8>, text: &str, width: usize) {
    let mut bytes = text.as_bytes().to_vec();
    bytes.truncate(width);
    bytes.resize(width, b' ');
    buf.extend_from_slice(&bytes);
}

fn pad_to_record_boundary(buf: &mut Vec<u8>) {
    let remainder = buf.len() % RECORD_LEN;
    if remainder != 0 {
        buf.resize(buf.len() + (RECORD_LEN - remainder), 0);
    }
}

fn decday(instant: &specio_text::Instant) -> (f32, f64) {
    let naive = instant.naive();
    let epoch = NaiveDate::from_ymd_opt(DECDAY_EPOCH_YEAR, 1, 1).expect("valid epoch date");
    let days = (naive.date() - epoch).num_days() as f64;
    let day_fraction = (naive.time() - chrono::NaiveTime::MIN).num_microseconds().unwrap_or(0) as f64
        / (24.0 * 60.0 * 60.0 * 1.0e6);
    let value = days + day_fraction;
    (value as f32, value)
}

fn calibration_coefficients(calibration: &EnergyCalibration) -> [f32; 3] {
    let coefficients = match calibration {
        EnergyCalibration::Polynomial { coefficients, .. } => coefficients.as_slice(),
        _ => &[],
    };
    let mut out = [0f32; 3];
    for (slot, value) in out.iter_mut().zip(coefficients.iter()) {
        *slot = *value as f32;
    }
    out
}

/// Write `measurement` (already summed to a single spectrum) as a binary
/// Ortec SPC file
pub fn write_spc(file: &SpecFile, mut sink: impl Write) -> Result<()> {
    let measurements = file.measurements();
    if measurements.is_empty() {
        return Err(Error::NoMeasurements);
    }
    let measurement: Measurement = if measurements.len() == 1 {
        measurements.into_iter().next().unwrap()
    } else {
        file.sum_measurements(None)?
    };

    if measurement.gamma_counts.is_empty() {
        return Err(Error::NoMeasurements);
    }
    if measurement.gamma_counts.len() > u16::MAX as usize {
        return Err(Error::TooManyChannels(measurement.gamma_counts.len()));
    }

    let n_channel = measurement.gamma_counts.len() as u16;
    let spectrum_record_count = (n_channel as u32).div_ceil(32).max(1) as i16;

    let needs_report = measurement.contained_neutron
        || !measurement.neutron_counts.is_empty()
        || measurement.gps.is_some()
        || file.analysis().is_some_and(|a| !a.results.is_empty());

    let report_text = build_report_text(&measurement, file);
    let report_records = if needs_report {
        (4 + report_text.len()).div_ceil(RECORD_LEN).max(1) as i16
    } else {
        0
    };

    // record layout: 1=header, [2=expansion header, 3..=report], calibration, acquisition, spectrum
    let expansion_ptr: i16 = if needs_report { 2 } else { 0 };
    let calibration_ptr: i16 = if needs_report { 3 + report_records } else { 2 };
    let acquisition_ptr: i16 = calibration_ptr + 1;
    let spectrum_ptr: i16 = acquisition_ptr + 1;

    let mut header = Vec::with_capacity(RECORD_LEN);
    push_i16(&mut header, 1); // wINFTYP
    push_i16(&mut header, 5); // wFILTYP: always write float channel data
    header.extend_from_slice(&[0u8; 4]); // wSkip1
    push_i16(&mut header, acquisition_ptr); // wACQIRP
    push_i16(&mut header, 0); // wSAMDRP
    push_i16(&mut header, 0); // wDETDRP
    header.extend_from_slice(&[0u8; 18]); // wSKIP2
    push_i16(&mut header, 0); // wCALDES
    push_i16(&mut header, calibration_ptr); // wCALRP1
    push_i16(&mut header, 0); // wCALRP2
    push_i16(&mut header, 0); // wEFFPRP
    push_i16(&mut header, 0); // wROIRP1
    push_i16(&mut header, 0); // wEPRP
    push_i16(&mut header, 0); // wEPN
    header.extend_from_slice(&[0u8; 12]); // wSkip3
    push_i16(&mut header, 0); // wEFFPNM
    push_i16(&mut header, spectrum_ptr); // wSPCTRP
    push_i16(&mut header, spectrum_record_count); // wSPCRCN
    push_u16(&mut header, n_channel);
    push_i16(&mut header, 0); // wABSTCHN

    let (acq_decday_f32, acq_decday_f64) = measurement
        .start_time
        .map(|t| decday(&t))
        .unwrap_or((0.0, 0.0));
    push_f32(&mut header, acq_decday_f32);
    header.extend_from_slice(&acq_decday_f64.to_le_bytes());

    header.extend_from_slice(&[0u8; 8]); // wSkip4
    push_i16(&mut header, 0); // wCHNSRT
    push_f32(&mut header, measurement.real_time.as_secs_f32());
    push_f32(&mut header, measurement.live_time.as_secs_f32());
    header.extend_from_slice(&[0u8; 2]); // wSkip50
    header.extend_from_slice(&[0u8; 10]); // fram/trifid/nai/location/mcsdata pointers
    push_i16(&mut header, expansion_ptr);
    header.extend_from_slice(&[0u8; 10]); // reserved + RRSFCT
    pad_to_record_boundary(&mut header);

    let mut out = header;

    if needs_report {
        let mut expansion = Vec::with_capacity(RECORD_LEN);
        push_i16(&mut expansion, 111); // record id
        push_i16(&mut expansion, 0); // gps pointer: not implemented
        push_i16(&mut expansion, 3); // first report record, relative to this block
        pad_to_record_boundary(&mut expansion);
        out.extend_from_slice(&expansion);

        let mut report = Vec::with_capacity(4 + report_text.len());
        push_u16(&mut report, report_text.len() as u16);
        push_u16(&mut report, 1); // source code bit 0: Detective-EX
        report.extend_from_slice(report_text.as_bytes());
        pad_to_record_boundary(&mut report);
        out.extend_from_slice(&report);
    }

    let mut calibration = Vec::with_capacity(RECORD_LEN);
    calibration.extend_from_slice(&[0u8; 8]); // wAFIT, wBFIT, wEFFPRS, wNCH
    calibration.extend_from_slice(&[0u8; 12]); // sKNEE, sASIG, sBSIG
    let [a, b, c] = calibration_coefficients(&measurement.energy_calibration);
    push_f32(&mut calibration, a);
    push_f32(&mut calibration, b);
    push_f32(&mut calibration, c);
    pad_to_record_boundary(&mut calibration);
    out.extend_from_slice(&calibration);

    let mut acquisition = Vec::with_capacity(RECORD_LEN);
    push_padded(&mut acquisition, measurement.title.as_deref().unwrap_or("SPC"), 16);
    let date_time = measurement
        .start_time
        .map(|t| t.to_vax_short_string())
        .unwrap_or_default();
    let (date_part, time_part) = date_time.split_once(' ').unwrap_or((&date_time, ""));
    push_padded(&mut acquisition, date_part, 9);
    acquisition.extend_from_slice(&[0u8; 3]);
    push_padded(&mut acquisition, time_part, 8);
    pad_to_record_boundary(&mut acquisition);
    out.extend_from_slice(&acquisition);

    let mut spectrum = Vec::with_capacity(4 * n_channel as usize);
    for count in &measurement.gamma_counts {
        push_f32(&mut spectrum, *count as f32);
    }
    pad_to_record_boundary(&mut spectrum);
    out.extend_from_slice(&spectrum);

    sink.write_all(&out)?;
    Ok(())
}

fn build_report_text(measurement: &Measurement, file: &SpecFile) -> String {
    let mut text = String::new();
    if measurement.contained_neutron || !measurement.neutron_counts.is_empty() {
        text.push_str(&format!("Total neutron counts = {}\r\n", measurement.neutron_sum()));
    }
    if let Some(analysis) = file.analysis() {
        if let Some(dose_rate) = analysis.results.iter().find_map(|r| r.dose_rate) {
            text.push_str(&format!("Gamma Dose Rate {dose_rate}\r\n"));
        }
        let found: Vec<&str> = analysis
            .results
            .iter()
            .filter(|r| r.nuclide_type.as_deref() == Some("Found"))
            .map(|r| r.nuclide.as_str())
            .collect();
        let suspect: Vec<&str> = analysis
            .results
            .iter()
            .filter(|r| r.nuclide_type.as_deref() == Some("Suspect"))
            .map(|r| r.nuclide.as_str())
            .collect();
        if !found.is_empty() {
            text.push_str(&format!("Found Nuclides{}\r\n", found.join("\t")));
        }
        if !suspect.is_empty() {
            text.push_str(&format!("Suspect Nuclides{}\r\n", suspect.join("\t")));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_spc;
    use specio_core::{DetectorAnalysis, DetectorAnalysisResult};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn refuses_to_write_an_empty_file() {
        let file = SpecFile::new();
        let mut buffer = Vec::new();
        assert!(matches!(write_spc(&file, &mut buffer), Err(Error::NoMeasurements)));
    }

    #[test]
    fn round_trips_neutron_totals_and_analysis() {
        let file = SpecFile::new();
        let mut m = Measurement::new("Aa1");
        m.gamma_counts = vec![0.0, 5.0, 10.0, 0.0];
        m.neutron_counts = vec![42.0];
        m.real_time = Duration::from_secs_f64(8.0);
        m.live_time = Duration::from_secs_f64(7.5);
        m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, 1.0], vec![], 4).unwrap());
        file.push_measurement(m);
        file.set_analysis(DetectorAnalysis {
            algorithm_name: None,
            results: vec![
                DetectorAnalysisResult {
                    nuclide: "Co60".into(),
                    nuclide_type: Some("Found".into()),
                    id_confidence: None,
                    dose_rate: None,
                    remark: None,
                },
                DetectorAnalysisResult {
                    nuclide: String::new(),
                    nuclide_type: None,
                    id_confidence: None,
                    dose_rate: Some(0.07),
                    remark: Some("Gamma Dose Rate".into()),
                },
            ],
        });

        let mut buffer = Vec::new();
        write_spc(&file, &mut buffer).unwrap();

        let roundtrip = SpecFile::new();
        read_spc(std::io::Cursor::new(&buffer), &roundtrip).unwrap();

        let measurements = roundtrip.measurements();
        assert_eq!(measurements[0].neutron_sum(), 42.0);
        let analysis = roundtrip.analysis().unwrap();
        assert_eq!(analysis.results[0].nuclide, "Co60");
        assert!(analysis.results.iter().any(|r| r.dose_rate == Some(0.07)));
    }
}
