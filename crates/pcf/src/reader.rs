//! Fixed-record PCF reader

use crate::error::{Error, Result};
use crate::name::{update_detector_name_from_title, DetectorIndex, DEVIATION_SLOTS, MAX_DEVIATION_PAIRS};
use crate::RECORD_LEN;
use specio_core::{DeviationPair, EnergyCalibration, Measurement, SpecFile};
use specio_text::{time_from_string, DateOrder};
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

fn read_u16(source: &mut impl Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    source.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_i32(source: &mut impl Read) -> Result<i32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32(source: &mut impl Read) -> Result<f32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_i16(source: &mut impl Read) -> Result<i16> {
    let mut buf = [0u8; 2];
    source.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

fn skip(source: &mut impl Read, bytes: usize) -> Result<()> {
    let mut buf = vec![0u8; bytes];
    source.read_exact(&mut buf)?;
    Ok(())
}

fn read_padded_string(source: &mut impl Read, width: usize) -> Result<String> {
    let mut buf = vec![0u8; width];
    source.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).trim().to_string())
}

struct Header {
    compressed_deviation_pairs: bool,
    title: String,
}

fn read_header(source: &mut impl Read) -> Result<Header> {
    let version = read_u16(source)?;
    if version != 1 {
        return Err(Error::NotPcf(version));
    }
    let compressed_deviation_pairs = read_u16(source)? != 0;
    let _max_channels = read_u16(source)?;
    skip(source, 2)?; // reserved
    let title = read_padded_string(source, 80)?;
    let modified_text = read_padded_string(source, 20)?;
    if !modified_text.is_empty() && time_from_string(&modified_text, DateOrder::LittleEndianFirst).is_none() {
        log::debug!("unparseable PCF header last-modified string {modified_text:?}");
    }
    skip(source, RECORD_LEN - 2 - 2 - 2 - 2 - 80 - 20)?;

    Ok(Header {
        compressed_deviation_pairs,
        title,
    })
}

fn read_deviation_table(source: &mut impl Read, compressed: bool) -> Result<Vec<Vec<DeviationPair>>> {
    let mut table = Vec::with_capacity(DEVIATION_SLOTS);
    for _ in 0..DEVIATION_SLOTS {
        let mut raw = Vec::with_capacity(MAX_DEVIATION_PAIRS);
        for _ in 0..MAX_DEVIATION_PAIRS {
            let (energy, offset) = if compressed {
                (read_i16(source)? as f64, read_i16(source)? as f64)
            } else {
                (read_f32(source)? as f64, read_f32(source)? as f64)
            };
            raw.push((energy, offset));
        }
        while matches!(raw.last(), Some((0.0, 0.0))) {
            raw.pop();
        }
        table.push(raw.into_iter().map(|(e, o)| DeviationPair::new(e, o)).collect());
    }
    Ok(table)
}

struct Preamble {
    index: Option<DetectorIndex>,
    pcf_tag: Option<char>,
    title: String,
    start_time: Option<specio_text::Instant>,
    real_time_secs: f32,
    live_time_secs: f32,
    n_channel: u16,
    neutron_count: Option<f64>,
    calibration_coefficients: [f32; 3],
    sample_number: i32,
}

fn read_preamble(source: &mut impl Read) -> Result<Preamble> {
    let raw_name = read_padded_string(source, 8)?;
    let index = crate::name::parse_detector_name(&raw_name).ok();

    let mut tag_buf = [0u8; 1];
    source.read_exact(&mut tag_buf)?;
    let pcf_tag = (tag_buf[0] != 0 && tag_buf[0] != b' ').then(|| tag_buf[0] as char);
    skip(source, 1)?; // reserved

    let title = read_padded_string(source, 40)?;

    let date_text = read_padded_string(source, 20)?;
    let start_time = time_from_string(&date_text, DateOrder::LittleEndianFirst);
    if !date_text.is_empty() && start_time.is_none() {
        log::debug!("unparseable PCF acquisition date string {date_text:?}");
    }

    let real_time_secs = read_f32(source)?;
    let live_time_secs = read_f32(source)?;
    let n_channel = read_u16(source)?;
    let has_neutron = read_u16(source)? != 0;
    let neutron_total = read_f32(source)? as f64;
    let a = read_f32(source)?;
    let b = read_f32(source)?;
    let c = read_f32(source)?;
    let sample_number = read_i32(source)?;
    skip(source, RECORD_LEN - 8 - 1 - 1 - 40 - 20 - 4 - 4 - 2 - 2 - 4 - 4 - 4 - 4 - 4)?;

    let index = index.or_else(|| update_detector_name_from_title(&title));

    Ok(Preamble {
        index,
        pcf_tag,
        title,
        start_time,
        real_time_secs,
        live_time_secs,
        n_channel,
        neutron_count: has_neutron.then_some(neutron_total),
        calibration_coefficients: [a, b, c],
        sample_number,
    })
}

/// Parse a 256-byte-record PCF spectrum file into `file`
pub fn read_pcf<R: Read + Seek>(mut source: R, file: &SpecFile) -> Result<()> {
    let file_len = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;

    if file_len < RECORD_LEN as u64 {
        return Err(Error::Truncated("header"));
    }
    let header = read_header(&mut source)?;
    let deviation_table = read_deviation_table(&mut source, header.compressed_deviation_pairs)?;

    loop {
        let remaining = file_len.saturating_sub(source.stream_position()?);
        if remaining < RECORD_LEN as u64 {
            break;
        }

        let preamble = read_preamble(&mut source)?;
        let n_channel = preamble.n_channel as usize;
        let channel_records = (n_channel * 4).div_ceil(RECORD_LEN);
        let channel_bytes = channel_records * RECORD_LEN;
        if file_len.saturating_sub(source.stream_position()?) < channel_bytes as u64 {
            return Err(Error::Truncated("channel data"));
        }

        let mut gamma_counts = vec![0.0f64; n_channel];
        for slot in gamma_counts.iter_mut() {
            *slot = read_f32(&mut source)? as f64;
        }
        skip(&mut source, channel_bytes - n_channel * 4)?;

        let deviation_pairs = preamble
            .index
            .map(|idx| deviation_table[idx.slot()].clone())
            .unwrap_or_default();

        let energy_calibration = if n_channel > 1 {
            let coefficients = preamble.calibration_coefficients.iter().map(|c| *c as f64).collect();
            match EnergyCalibration::polynomial(coefficients, deviation_pairs, n_channel as u32) {
                Ok(cal) => Arc::new(cal),
                Err(err) => {
                    log::debug!("PCF calibration did not validate: {err}");
                    Arc::new(EnergyCalibration::Invalid)
                }
            }
        } else {
            Arc::new(EnergyCalibration::Invalid)
        };

        let detector_name = preamble
            .index
            .map(|idx| idx.to_name())
            .unwrap_or_else(|| "Aa1".to_string());

        let mut measurement = Measurement::new(detector_name);
        measurement.sample_number = preamble.sample_number;
        measurement.title = (!preamble.title.is_empty()).then_some(preamble.title);
        measurement.start_time = preamble.start_time;
        measurement.real_time = Duration::from_secs_f32(preamble.real_time_secs.max(0.0));
        measurement.live_time = Duration::from_secs_f32(preamble.live_time_secs.max(0.0));
        measurement.pcf_tag = preamble.pcf_tag;
        measurement.energy_calibration = energy_calibration;
        measurement.gamma_counts = gamma_counts;
        if let Some(total) = preamble.neutron_count {
            measurement.contained_neutron = true;
            if total != 0.0 {
                measurement.neutron_counts = vec![total];
            }
        }

        file.push_measurement(measurement);
    }

    if !header.title.is_empty() {
        file.set_title(header.title);
    }

    file.cleanup_after_load()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_pcf;
    use std::io::Cursor;
    use std::time::Duration as StdDuration;

    fn sample_measurement(name: &str, tag: char, scale: f64, neutron: f64) -> Measurement {
        let mut m = Measurement::new(name);
        m.gamma_counts = (0..128).map(|i| i as f64 * scale).collect();
        m.real_time = StdDuration::from_secs_f64(10.0);
        m.live_time = StdDuration::from_secs_f64(9.5);
        m.pcf_tag = Some(tag);
        m.neutron_counts = vec![neutron];
        let pairs: Vec<DeviationPair> = (0..20).map(|i| DeviationPair::new(i as f64 * 50.0, i as f64)).collect();
        m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, 1.0 * scale], pairs, 128).unwrap());
        m
    }

    #[test]
    fn round_trips_four_measurements() {
        let file = SpecFile::new();
        file.push_measurement(sample_measurement("Ba1", 'T', 1.0, 100.0));
        file.push_measurement(sample_measurement("Aa2", 'K', 2.0, 101.0));
        file.push_measurement(sample_measurement("Bc3", '-', 3.0, 102.0));
        file.push_measurement(sample_measurement("Cb4", '<', 4.0, 103.0));

        let mut buffer = Vec::new();
        write_pcf(&file, Cursor::new(&mut buffer)).unwrap();

        let roundtrip = SpecFile::new();
        read_pcf(Cursor::new(&buffer), &roundtrip).unwrap();
        let measurements = roundtrip.measurements();
        assert_eq!(measurements.len(), 4);

        let first = measurements.iter().find(|m| m.detector_name == "Ba1").unwrap();
        assert_eq!(first.pcf_tag, Some('T'));
        assert_eq!(first.neutron_sum(), 100.0);
        assert_eq!(first.gamma_counts.len(), 128);
        match first.energy_calibration.as_ref() {
            EnergyCalibration::Polynomial { deviation_pairs, .. } => {
                assert_eq!(deviation_pairs.len(), 20);
                assert_eq!(deviation_pairs[5].energy, 250.0);
            }
            other => panic!("expected polynomial calibration, got {other:?}"),
        }

        let third = measurements.iter().find(|m| m.detector_name == "Bc3").unwrap();
        let idx = crate::name::parse_detector_name("Bc3").unwrap();
        assert!(idx.uses_compressed_deviation_pairs());
        assert_eq!(third.pcf_tag, Some('-'));
    }

    #[test]
    fn rejects_bad_header_version() {
        let mut bytes = vec![0u8; RECORD_LEN * 2];
        bytes[0..2].copy_from_slice(&9u16.to_le_bytes());
        let file = SpecFile::new();
        assert!(matches!(read_pcf(Cursor::new(bytes), &file), Err(Error::NotPcf(9))));
    }
}
