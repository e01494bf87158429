//! Fixed-record PCF writer: the inverse of [`crate::reader::read_pcf`]
//!
//! Every measurement must declare the same channel count as the first one
//! in the file; PCF has no per-measurement record-count field to make a
//! mixed file self-describing, so resampling to a common count is left to
//! the caller.

use crate::error::{Error, Result};
use crate::name::{parse_detector_name, DetectorIndex, DEVIATION_SLOTS, MAX_DEVIATION_PAIRS};
use crate::RECORD_LEN;
use specio_core::{EnergyCalibration, Measurement, SpecFile};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_f32(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_i16(buf: &mut Vec<u8>, value: i16) {
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

fn deviation_pairs(calibration: &EnergyCalibration) -> &[specio_core::DeviationPair] {
    match calibration {
        EnergyCalibration::Polynomial { deviation_pairs, .. } => deviation_pairs,
        _ => &[],
    }
}

fn indices_for(measurement: &Measurement) -> Option<DetectorIndex> {
    parse_detector_name(&measurement.detector_name)
        .ok()
        .or_else(|| measurement.title.as_deref().and_then(crate::name::update_detector_name_from_title))
}

fn write_deviation_table(out: &mut Vec<u8>, measurements: &[Measurement], compressed: bool) {
    let mut table: Vec<&[specio_core::DeviationPair]> = vec![&[]; DEVIATION_SLOTS];
    for m in measurements {
        if let Some(idx) = indices_for(m) {
            table[idx.slot()] = deviation_pairs(&m.energy_calibration);
        }
    }

    for pairs in table {
        for i in 0..MAX_DEVIATION_PAIRS {
            let (energy, offset) = pairs.get(i).map(|p| (p.energy, p.offset)).unwrap_or((0.0, 0.0));
            if compressed {
                push_i16(out, energy.round() as i16);
                push_i16(out, offset.round() as i16);
            } else {
                push_f32(out, energy as f32);
                push_f32(out, offset as f32);
            }
        }
    }
}

/// Write `file`'s measurements as a fixed-record PCF spectrum file
///
/// All measurements must carry the same channel count, matching the way
/// PCF is actually produced: a single acquisition session writing to a
/// fixed-size buffer, not a container assembled from heterogeneous sources.
pub fn write_pcf(file: &SpecFile, mut sink: impl Write) -> Result<()> {
    let measurements = file.measurements();
    let usable: Vec<Measurement> = measurements.into_iter().filter(|m| !m.gamma_counts.is_empty()).collect();
    if usable.is_empty() {
        return Err(Error::NoMeasurements);
    }

    let n_channel = usable[0].gamma_counts.len();
    if n_channel > u16::MAX as usize {
        return Err(Error::TooManyChannels(n_channel));
    }
    for m in &usable {
        if m.gamma_counts.len() != n_channel {
            return Err(Error::NonUniformChannelCount {
                detector: m.detector_name.clone(),
                expected: n_channel,
                found: m.gamma_counts.len(),
            });
        }
    }

    let compressed = usable
        .iter()
        .any(|m| indices_for(m).is_some_and(|idx| idx.uses_compressed_deviation_pairs()));

    let mut header = Vec::with_capacity(RECORD_LEN);
    push_u16(&mut header, 1); // version
    push_u16(&mut header, compressed as u16);
    push_u16(&mut header, n_channel as u16);
    push_u16(&mut header, 0); // reserved
    push_padded(&mut header, file.title().as_deref().unwrap_or(""), 80);
    push_padded(&mut header, "", 20); // last-modified: unknown at write time
    pad_to_record_boundary(&mut header);

    let mut out = header;
    write_deviation_table(&mut out, &usable, compressed);

    for measurement in &usable {
        let mut preamble = Vec::with_capacity(RECORD_LEN);
        let name = indices_for(measurement).map(|idx| idx.to_name()).unwrap_or_else(|| measurement.detector_name.clone());
        push_padded(&mut preamble, &name, 8);
        preamble.push(measurement.pcf_tag.map(|c| c as u8).unwrap_or(b' '));
        preamble.push(0); // reserved
        push_padded(&mut preamble, measurement.title.as_deref().unwrap_or(""), 40);
        let date_text = measurement.start_time.map(|t| t.to_vax_short_string()).unwrap_or_default();
        push_padded(&mut preamble, &date_text, 20);
        push_f32(&mut preamble, measurement.real_time.as_secs_f32());
        push_f32(&mut preamble, measurement.live_time.as_secs_f32());
        push_u16(&mut preamble, n_channel as u16);
        let has_neutron = measurement.contained_neutron || !measurement.neutron_counts.is_empty();
        push_u16(&mut preamble, has_neutron as u16);
        push_f32(&mut preamble, measurement.neutron_sum() as f32);
        let [a, b, c] = calibration_coefficients(&measurement.energy_calibration);
        push_f32(&mut preamble, a);
        push_f32(&mut preamble, b);
        push_f32(&mut preamble, c);
        push_i32(&mut preamble, measurement.sample_number);
        pad_to_record_boundary(&mut preamble);
        out.extend_from_slice(&preamble);

        let mut channels = Vec::with_capacity(4 * n_channel);
        for count in &measurement.gamma_counts {
            push_f32(&mut channels, *count as f32);
        }
        pad_to_record_boundary(&mut channels);
        out.extend_from_slice(&channels);
    }

    sink.write_all(&out)?;
    Ok(())
}

/// Write `file` to `path`, refusing to overwrite a destination that already
/// exists
pub fn write_pcf_to_path(file: &SpecFile, path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::DestinationExists(path.to_path_buf()));
    }
    let handle = OpenOptions::new().write(true).create_new(true).open(path)?;
    write_pcf(file, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_write_an_empty_file() {
        let file = SpecFile::new();
        let mut buffer = Vec::new();
        assert!(matches!(write_pcf(&file, &mut buffer), Err(Error::NoMeasurements)));
    }

    #[test]
    fn rejects_mismatched_channel_counts() {
        let file = SpecFile::new();
        let mut a = Measurement::new("Aa1");
        a.gamma_counts = vec![1.0, 2.0, 3.0];
        let mut b = Measurement::new("Ba1");
        b.gamma_counts = vec![1.0, 2.0];
        file.push_measurement(a);
        file.push_measurement(b);

        let mut buffer = Vec::new();
        assert!(matches!(
            write_pcf(&file, &mut buffer),
            Err(Error::NonUniformChannelCount { .. })
        ));
    }
}
