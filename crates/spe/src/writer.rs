//! IAEA SPE writer: the inverse of [`crate::reader::read_spe`]

use crate::error::Result;
use specio_core::{EnergyCalibration, Measurement, SpecFile};
use std::io::Write;

const LINE_ENDING: &str = "\r\n";

/// Format `value` approximately as C's `%.9g`: up to 9 significant digits,
/// switching to scientific notation outside `[1e-4, 1e9)`
fn format_g9(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let abs = value.abs();
    if !(1e-4..1e9).contains(&abs) {
        return trim_exponent(&format!("{value:.8e}"));
    }

    let leading_digits = (abs.log10().floor() as i32 + 1).max(1);
    let decimals = (9 - leading_digits).max(0) as usize;
    trim_trailing_zeros(&format!("{value:.decimals$}"))
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    trimmed.trim_end_matches('.').to_string()
}

fn trim_exponent(s: &str) -> String {
    // "1.23456780e2" -> "1.2345678e2"
    let Some(e_pos) = s.find('e') else { return s.to_string() };
    let (mantissa, exponent) = s.split_at(e_pos);
    format!("{}{exponent}", trim_trailing_zeros(mantissa))
}

fn write_tag(out: &mut impl Write, tag: &str, value: &str) -> Result<()> {
    write!(out, "${tag}:{LINE_ENDING}{value}{LINE_ENDING}")?;
    Ok(())
}

fn calibration_coefficients(calibration: &EnergyCalibration) -> Option<&[f64]> {
    match calibration {
        EnergyCalibration::Polynomial { coefficients, .. } => Some(coefficients),
        _ => None,
    }
}

fn write_measurement(out: &mut impl Write, measurement: &Measurement) -> Result<()> {
    write_tag(out, "SPEC_ID", measurement.title.as_deref().unwrap_or(""))?;

    if let Some(start) = measurement.start_time {
        write_tag(out, "DATE_MEA", &start.to_middle_endian_string())?;
    }

    write_tag(
        out,
        "MEAS_TIM",
        &format!(
            "{} {}",
            format_g9(measurement.live_time.as_secs_f64()),
            format_g9(measurement.real_time.as_secs_f64())
        ),
    )?;

    if let Some(coefficients) = calibration_coefficients(&measurement.energy_calibration) {
        let line = coefficients
            .iter()
            .map(|c| format!("{} keV", format_g9(*c)))
            .collect::<Vec<_>>()
            .join(" ");
        write_tag(out, "MCA_CAL", &format!("{}{LINE_ENDING}{line}", coefficients.len()))?;

        if let EnergyCalibration::Polynomial { deviation_pairs, .. } = measurement.energy_calibration.as_ref() {
            if !deviation_pairs.is_empty() {
                let mut body = format!("{}", deviation_pairs.len());
                for pair in deviation_pairs {
                    body.push_str(LINE_ENDING);
                    body.push_str(&format!("{} {}", format_g9(pair.energy), format_g9(pair.offset)));
                }
                write_tag(out, "NON_LINEAR_DEVIATIONS", &body)?;
            }
        }
    }

    if let Some(gps) = measurement.gps {
        write_tag(out, "GPS", &format!("{} {}", gps.latitude, gps.longitude))?;
    }

    if !measurement.neutron_counts.is_empty() {
        let sum = measurement.neutron_sum();
        if let Some(multiplier) = measurement.neutron_counts_per_second_multiplier.filter(|m| *m > 0.0) {
            write_tag(out, "NEUTRON_CPS", &format_g9(sum / multiplier))?;
        } else {
            write_tag(out, "NEUTRONS", &format_g9(sum))?;
        }
    }

    if !measurement.gamma_counts.is_empty() {
        let mut body = format!("0 {}", measurement.gamma_counts.len().saturating_sub(1));
        for count in &measurement.gamma_counts {
            body.push_str(LINE_ENDING);
            body.push_str(&format_g9(*count));
        }
        write_tag(out, "DATA", &body)?;
    }

    write!(out, "$ENDRECORD:{LINE_ENDING}")?;
    Ok(())
}

/// Write every measurement in `file` as a sequence of IAEA SPE records
pub fn write_spe(file: &SpecFile, mut sink: impl Write) -> Result<()> {
    for measurement in file.measurements() {
        write_measurement(&mut sink, &measurement)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_spe;
    use std::time::Duration;

    #[test]
    fn g9_formats_match_expected_precision() {
        assert_eq!(format_g9(0.0), "0");
        assert_eq!(format_g9(3.0), "3");
        assert_eq!(format_g9(1.23456789e-6), trim_exponent(&format!("{:.8e}", 1.23456789e-6)));
        assert_eq!(format_g9(295.1), "295.1");
    }

    #[test]
    fn round_trips_channel_data_and_calibration() {
        let file = SpecFile::new();
        let mut m = Measurement::new("Aa1");
        m.gamma_counts = vec![1.0, 2.0, 3.0];
        m.live_time = Duration::from_secs_f64(9.0);
        m.real_time = Duration::from_secs_f64(10.0);
        m.energy_calibration = std::sync::Arc::new(
            EnergyCalibration::polynomial(vec![0.0, 3.0], vec![], 3).unwrap(),
        );
        file.push_measurement(m);

        let mut buffer = Vec::new();
        write_spe(&file, &mut buffer).unwrap();

        let roundtrip = SpecFile::new();
        read_spe(buffer.as_slice(), &roundtrip).unwrap();
        assert_eq!(roundtrip.measurements()[0].gamma_counts, vec![1.0, 2.0, 3.0]);
        assert_eq!(roundtrip.measurements()[0].energy_for_channel(1.0), 3.0);
    }
}
