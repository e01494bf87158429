//! Binary SPC reader

use crate::error::{Error, Result};
use crate::serial::guess_submodel;
use crate::RECORD_LEN;
use specio_core::{DetectorAnalysis, DetectorAnalysisResult, EnergyCalibration, Measurement, SpecFile};
use specio_text::{time_from_string, DateOrder};
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

fn read_i16(source: &mut impl Read) -> Result<i16> {
    let mut buf = [0u8; 2];
    source.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

fn read_u16(source: &mut impl Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    source.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_f32(source: &mut impl Read) -> Result<f32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn skip(source: &mut impl Read, bytes: usize) -> Result<()> {
    let mut buf = vec![0u8; bytes];
    source.read_exact(&mut buf)?;
    Ok(())
}

/// Byte offset of 1-based record number `pointer`, or `None` if absent (`0`)
fn record_offset(pointer: i16) -> Option<u64> {
    if pointer <= 0 {
        None
    } else {
        Some((pointer as u64 - 1) * RECORD_LEN)
    }
}

fn validate_pointer(pointer: i16, file_len: u64, kind: &'static str) -> Result<Option<u64>> {
    match record_offset(pointer) {
        Some(offset) if offset >= file_len => Err(Error::PointerOutOfRange { pointer, kind }),
        other => Ok(other),
    }
}

struct Header {
    integer_channels: bool,
    acquisition_info_ptr: i16,
    detector_description_ptr: i16,
    calibration_ptr: i16,
    spectrum_ptr: i16,
    spectrum_record_count: i16,
    n_channel: u16,
    real_time_secs: f32,
    live_time_secs: f32,
    expansion_header_ptr: i16,
}

fn read_header(source: &mut impl Read) -> Result<Header> {
    let info_type = read_i16(source)?;
    if info_type != 1 {
        return Err(Error::NotSpc(info_type));
    }
    let file_type = read_i16(source)?;
    let integer_channels = match file_type {
        1 => true,
        5 => false,
        other => return Err(Error::UnknownChannelFormat(other)),
    };

    skip(source, 2 * 2)?; // wSkip1
    let acquisition_info_ptr = read_i16(source)?; // wACQIRP
    let _sample_description_ptr = read_i16(source)?; // wSAMDRP
    let detector_description_ptr = read_i16(source)?; // wDETDRP
    skip(source, 2 * 9)?; // wSKIP2
    let _calibration_description_ptr = read_i16(source)?; // wCALDES
    let calibration_ptr = read_i16(source)?; // wCALRP1
    let _calibration_ptr2 = read_i16(source)?; // wCALRP2
    let _efficiency_pairs_ptr = read_i16(source)?; // wEFFPRP
    let _roi_ptr = read_i16(source)?; // wROIRP1
    let _energy_pairs_ptr = read_i16(source)?; // wEPRP
    let _energy_pairs_records = read_i16(source)?; // wEPN
    skip(source, 2 * 6)?; // wSkip3
    let _efficiency_pairs_records = read_i16(source)?; // wEFFPNM
    let spectrum_ptr = read_i16(source)?; // wSPCTRP
    let spectrum_record_count = read_i16(source)?; // wSPCRCN
    let n_channel = read_u16(source)?;

    if (32 * spectrum_record_count.max(0) as u32) < n_channel as u32 {
        return Err(Error::TooFewSpectrumRecords {
            record_count: spectrum_record_count,
            channel_count: n_channel,
        });
    }

    let _start_channel_physical = read_i16(source)?; // wABSTCHN
    let _acq_time_decday_f32 = read_f32(source)?; // sACQTIM
    skip(source, 8)?; // dACQTI8
    skip(source, 2 * 4)?; // wSkip4
    let _start_channel = read_i16(source)?; // wCHNSRT
    let real_time_secs = read_f32(source)?; // sRLTMDT
    let live_time_secs = read_f32(source)?; // sLVTMDT
    if real_time_secs < 0.0 || live_time_secs < 0.0 {
        return Err(Error::Truncated("header: negative real/live time"));
    }
    skip(source, 2)?; // wSkip50
    skip(source, 2 * 5)?; // fram/trifid/nai/location/mcsdata pointers, unused
    let expansion_header_ptr = read_i16(source)?;

    Ok(Header {
        integer_channels,
        acquisition_info_ptr,
        detector_description_ptr,
        calibration_ptr,
        spectrum_ptr,
        spectrum_record_count,
        n_channel,
        real_time_secs,
        live_time_secs,
        expansion_header_ptr,
    })
}

/// Only the energy-polynomial A, B, C coefficients; FWHM and efficiency
/// coefficients sharing this record are read past and discarded
fn read_calibration_coefficients(source: &mut impl Read) -> Result<[f32; 3]> {
    skip(source, 2 * 4)?; // wAFIT, wBFIT, wEFFPRS, wNCH
    skip(source, 4 * 3)?; // sKNEE, sASIG, sBSIG
    let a = read_f32(source)?;
    let b = read_f32(source)?;
    let c = read_f32(source)?;
    Ok([a, b, c])
}

fn read_detector_description(source: &mut impl Read) -> Result<Option<String>> {
    let mut buf = [0u8; RECORD_LEN as usize];
    source.read_exact(&mut buf)?;
    let text = String::from_utf8_lossy(&buf).trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string();
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn read_acquisition_info(source: &mut impl Read) -> Result<(String, Option<specio_text::Instant>)> {
    let mut name_buf = [0u8; 16];
    source.read_exact(&mut name_buf)?;
    let name = String::from_utf8_lossy(&name_buf).trim().to_string();

    let mut date_part = [0u8; 9];
    source.read_exact(&mut date_part)?;
    skip(source, 3)?;
    let mut time_part = [0u8; 8];
    source.read_exact(&mut time_part)?;

    let combined = format!(
        "{} {}",
        String::from_utf8_lossy(&date_part).trim(),
        String::from_utf8_lossy(&time_part).trim()
    );
    let start_time = time_from_string(&combined, DateOrder::LittleEndianFirst);
    if start_time.is_none() {
        log::debug!("unparseable SPC acquisition date string {combined:?}");
    }
    Ok((name, start_time))
}

fn parse_leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().ok()
}

/// Find `label` in `text` and parse the first number that follows it,
/// skipping over any stray non-digit bytes (embedded NULs are common in
/// this block) between the label and the value
fn parse_labeled_number(text: &str, label: &str) -> Option<f64> {
    let after = &text[text.find(label)? + label.len()..];
    let start = after.find(|c: char| c.is_ascii_digit() || c == '-')?;
    parse_leading_number(&after[start..])
}

fn extract_nuclides(report: &str, start_term: &str, fallback_term: &str, end_term: &str, category: &str) -> Vec<DetectorAnalysisResult> {
    let Some(start) = report.find(start_term).map(|i| i + start_term.len()).or_else(|| {
        report.find(fallback_term).map(|i| i + fallback_term.len())
    }) else {
        return Vec::new();
    };
    let end = report[start..].find(end_term).map(|i| start + i).unwrap_or(report.len());
    report[start..end]
        .split(|c: char| matches!(c, '\t' | ',' | '\n' | '\r' | '\0'))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|nuclide| DetectorAnalysisResult {
            nuclide: nuclide.to_string(),
            nuclide_type: Some(category.to_string()),
            id_confidence: None,
            dose_rate: None,
            remark: None,
        })
        .collect()
}

struct Report {
    total_neutrons: Option<f64>,
    analysis: Vec<DetectorAnalysisResult>,
}

fn read_identification_report(source: &mut impl Read, remaining_in_file: u64) -> Result<Report> {
    let text_len = read_u16(source)?;
    let _source_code = read_u16(source)?;
    let capped = (text_len as u64).min(remaining_in_file.saturating_sub(4)).min(2048) as usize;

    let mut buffer = vec![0u8; capped];
    source.read_exact(&mut buffer)?;
    let text = String::from_utf8_lossy(&buffer);
    let lower = text.to_ascii_lowercase();

    let total_neutrons = lower
        .find("total neutron counts = ")
        .map(|i| i + "total neutron counts = ".len())
        .or_else(|| lower.find("neutron counts").map(|i| i + "neutron counts".len()))
        .and_then(|i| parse_leading_number(&lower[i..]));

    let mut analysis = extract_nuclides(&text, "Found Nuclides", "Found:", "Suspect", "Found");
    analysis.extend(extract_nuclides(&text, "Suspect Nuclides", "Suspect:", "Top Lines", "Suspect"));

    if let Some(dose_rate) = parse_labeled_number(&text, "Gamma Dose Rate") {
        analysis.push(DetectorAnalysisResult {
            nuclide: String::new(),
            nuclide_type: None,
            id_confidence: None,
            dose_rate: Some(dose_rate),
            remark: Some("Gamma Dose Rate".into()),
        });
    }

    Ok(Report { total_neutrons, analysis })
}

/// Parse a binary Ortec SPC spectrum file into `file`
pub fn read_spc<R: Read + Seek>(mut source: R, file: &SpecFile) -> Result<()> {
    let file_len = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;

    let header = read_header(&mut source)?;

    let acquisition_offset = validate_pointer(header.acquisition_info_ptr, file_len, "acquisition info")?;
    let calibration_offset = validate_pointer(header.calibration_ptr, file_len, "calibration")?;
    let spectrum_offset = validate_pointer(header.spectrum_ptr, file_len, "spectrum")?
        .ok_or(Error::PointerOutOfRange { pointer: header.spectrum_ptr, kind: "spectrum" })?;
    let expansion_offset = validate_pointer(header.expansion_header_ptr, file_len, "expansion header")?;
    let detector_description_offset =
        validate_pointer(header.detector_description_ptr, file_len, "detector description")?;

    let mut name = String::new();
    let mut start_time = None;
    if let Some(offset) = acquisition_offset {
        source.seek(SeekFrom::Start(offset))?;
        let (n, t) = read_acquisition_info(&mut source)?;
        name = n;
        start_time = t;
    }

    let mut detector_description = None;
    if let Some(offset) = detector_description_offset {
        source.seek(SeekFrom::Start(offset))?;
        detector_description = read_detector_description(&mut source)?;
    }

    let mut calibration_coefficients = [0f32; 3];
    if let Some(offset) = calibration_offset {
        source.seek(SeekFrom::Start(offset))?;
        calibration_coefficients = read_calibration_coefficients(&mut source)?;
    }

    let mut total_neutrons = None;
    let mut analysis_results = Vec::new();
    if let Some(offset) = expansion_offset {
        source.seek(SeekFrom::Start(offset))?;
        let record_id = read_i16(&mut source)?;
        let _gps_pointer = read_i16(&mut source)?; // GPS record decoding isn't implemented upstream either
        let mut report_pointer = read_i16(&mut source)?;
        if record_id != 111 {
            log::warn!("SPC expansion header has unexpected record id {record_id}");
            report_pointer = 0;
        }

        if let Some(report_offset) = validate_pointer(report_pointer, file_len, "identification report")? {
            source.seek(SeekFrom::Start(report_offset))?;
            let report = read_identification_report(&mut source, file_len - report_offset)?;
            total_neutrons = report.total_neutrons;
            analysis_results = report.analysis;
        }
    }

    source.seek(SeekFrom::Start(spectrum_offset))?;
    let n_channel = header.n_channel as usize;
    let mut gamma_counts = vec![0.0f64; n_channel];
    if header.integer_channels {
        for slot in gamma_counts.iter_mut() {
            let mut buf = [0u8; 4];
            source.read_exact(&mut buf)?;
            *slot = u32::from_le_bytes(buf) as f64;
        }
    } else {
        for slot in gamma_counts.iter_mut() {
            let mut buf = [0u8; 4];
            source.read_exact(&mut buf)?;
            *slot = f32::from_le_bytes(buf) as f64;
        }
    }
    if let Some(last) = gamma_counts.last_mut() {
        *last = 0.0;
    }
    if let Some(first) = gamma_counts.first_mut() {
        *first = 0.0;
    }

    let energy_calibration = if gamma_counts.len() > 2 {
        let coefficients = calibration_coefficients.iter().map(|c| *c as f64).collect::<Vec<_>>();
        match EnergyCalibration::polynomial(coefficients, Vec::new(), gamma_counts.len() as u32) {
            Ok(cal) => Arc::new(cal),
            Err(err) => {
                log::debug!("SPC calibration record did not validate: {err}");
                Arc::new(EnergyCalibration::Invalid)
            }
        }
    } else {
        Arc::new(EnergyCalibration::Invalid)
    };

    let mut measurement = Measurement::new("Aa1");
    measurement.title = Some(name.clone());
    measurement.start_time = start_time;
    measurement.detector_description = detector_description;
    measurement.real_time = Duration::from_secs_f32(header.real_time_secs.max(0.0));
    measurement.live_time = Duration::from_secs_f32(header.live_time_secs.max(0.0));
    measurement.energy_calibration = energy_calibration;
    measurement.gamma_counts = gamma_counts;
    if let Some(total) = total_neutrons {
        measurement.contained_neutron = true;
        if total > 0.0 {
            measurement.neutron_counts = vec![total];
        }
    }

    file.push_measurement(measurement);

    if !analysis_results.is_empty() {
        file.set_analysis(DetectorAnalysis { algorithm_name: None, results: analysis_results });
    }

    if let Some(submodel) = guess_submodel(&name) {
        file.set_instrument_id(submodel.label());
    }
    file.set_title(name);

    file.cleanup_after_load()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_spc;

    fn sample_measurement() -> Measurement {
        let mut m = Measurement::new("Aa1");
        m.gamma_counts = (0..16).map(|i| i as f64 * 2.0).collect();
        m.real_time = Duration::from_secs_f64(12.0);
        m.live_time = Duration::from_secs_f64(11.0);
        m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, 2.0], vec![], 16).unwrap());
        m
    }

    #[test]
    fn round_trips_channel_data_and_calibration() {
        let file = SpecFile::new();
        file.push_measurement(sample_measurement());

        let mut buffer = Vec::new();
        write_spc(&file, std::io::Cursor::new(&mut buffer)).unwrap();

        let roundtrip = SpecFile::new();
        read_spc(std::io::Cursor::new(&buffer), &roundtrip).unwrap();

        let measurements = roundtrip.measurements();
        assert_eq!(measurements.len(), 1);
        let m = &measurements[0];
        assert_eq!(m.gamma_counts.len(), 16);
        // first/last channel are always zeroed by the binary format
        assert_eq!(m.gamma_counts[0], 0.0);
        assert_eq!(m.gamma_counts[15], 0.0);
        assert_eq!(m.gamma_counts[5], 10.0);
        assert!((m.energy_for_channel(1.0) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_non_spc_header() {
        let mut bytes = vec![0u8; 256];
        bytes[0..2].copy_from_slice(&2i16.to_le_bytes());
        let file = SpecFile::new();
        assert!(matches!(read_spc(std::io::Cursor::new(bytes), &file), Err(Error::NotSpc(2))));
    }

    #[test]
    fn out_of_range_pointer_is_rejected() {
        let mut bytes = vec![0u8; 256];
        bytes[0..2].copy_from_slice(&1i16.to_le_bytes());
        bytes[2..4].copy_from_slice(&5i16.to_le_bytes());
        bytes[8..10].copy_from_slice(&9999i16.to_le_bytes()); // wACQIRP points past EOF
        let file = SpecFile::new();
        assert!(matches!(
            read_spc(std::io::Cursor::new(bytes), &file),
            Err(Error::PointerOutOfRange { kind: "acquisition info", .. })
        ));
    }
}
