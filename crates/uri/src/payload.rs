//! Key-value payload assembly and parsing for one spectrum

use crate::error::{Error, Result};
use crate::types::{EncodeOptions, UriDeviationPair, UriSourceType, UrlSpectrum};
use specio_text::{time_from_string, DateOrder, Instant};

const MODEL_MAX_BYTES: usize = 30;
const TITLE_MAX_BYTES: usize = 60;

fn separator(options: EncodeOptions) -> char {
    let final_stage_is_raw_text =
        options.has(EncodeOptions::NO_DEFLATE) && options.has(EncodeOptions::NO_BASEX_ENCODING);
    if final_stage_is_raw_text {
        '$'
    } else {
        ','
    }
}

/// Replace a space immediately preceding a capital-letter-colon sequence so
/// free text cannot forge a field marker
fn neutralize_field_markers(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    for i in 0..chars.len() {
        if chars[i] == ' '
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_uppercase())
            && chars.get(i + 2) == Some(&':')
        {
            out.push('_');
        } else {
            out.push(chars[i]);
        }
    }
    out
}

fn truncate_utf8(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    input[..end].to_string()
}

fn sanitize_free_text(input: &str, max_bytes: usize) -> String {
    truncate_utf8(&neutralize_field_markers(input), max_bytes)
}

fn join_floats(values: &[f32], sep: char) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(&sep.to_string())
}

/// Which free-text/shared fields were identical to the first spectrum in a
/// multi-spectrum encode, and so are omitted from this one's payload
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritedFields {
    pub model: bool,
    pub calibration: bool,
    pub gps: bool,
    pub title: bool,
}

/// Build the textual/binary key-value payload for one spectrum, not
/// including the `S:` channel-data region
pub fn build_preamble(spectrum: &UrlSpectrum, options: EncodeOptions, inherited: InheritedFields) -> String {
    let sep = separator(options);
    let mut fields = Vec::new();

    fields.push(format!("I:{}", spectrum.source_type.code()));
    fields.push(format!(
        "T:{}{}{}",
        spectrum.live_time,
        sep,
        spectrum.real_time
    ));

    if !inherited.calibration {
        if !spectrum.calibration_coeffs.is_empty() {
            fields.push(format!("C:{}", join_floats(&spectrum.calibration_coeffs, sep)));
        }
        if !spectrum.deviation_pairs.is_empty() {
            let flat: Vec<f32> = spectrum
                .deviation_pairs
                .iter()
                .flat_map(|p| [p.energy, p.offset])
                .collect();
            fields.push(format!("D:{}", join_floats(&flat, sep)));
        }
    }

    if !inherited.model {
        if let Some(model) = &spectrum.model {
            fields.push(format!("M:{}", sanitize_free_text(model, MODEL_MAX_BYTES)));
        }
    }

    if let Some(start_time) = &spectrum.start_time {
        fields.push(format!("P:{}", start_time.to_iso_seconds_string()));
    }

    if !inherited.gps {
        if let Some((lat, lon)) = spectrum.gps {
            fields.push(format!("G:{lat}{sep}{lon}"));
        }
    }

    if let Some(neutrons) = spectrum.neutron_sum {
        fields.push(format!("N:{neutrons}"));
    }

    if !inherited.title {
        if let Some(title) = &spectrum.title {
            fields.push(format!("O:{}", sanitize_free_text(title, TITLE_MAX_BYTES)));
        }
    }

    fields.join(" ")
}

/// One field parsed out of a payload preamble
#[derive(Debug, Clone)]
pub struct ParsedFields {
    pub source_type: UriSourceType,
    pub live_time: f32,
    pub real_time: f32,
    pub calibration_coeffs: Option<Vec<f32>>,
    pub deviation_pairs: Option<Vec<UriDeviationPair>>,
    pub model: Option<String>,
    pub start_time: Option<Instant>,
    pub gps: Option<(f64, f64)>,
    pub neutron_sum: Option<f32>,
    pub title: Option<String>,
}

fn split_subfields(value: &str) -> Vec<&str> {
    if value.contains(',') {
        value.split(',').collect()
    } else {
        value.split('$').collect()
    }
}

fn parse_floats(value: &str) -> Result<Vec<f32>> {
    split_subfields(value)
        .iter()
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| Error::MalformedField(format!("not a number: {s}")))
        })
        .collect()
}

/// Parse the space-separated `KEY:value` preamble, up to (but not
/// including) the `S:` channel-data marker
pub fn parse_preamble(input: &str) -> Result<(ParsedFields, usize)> {
    let s_marker_pos = input
        .find("S:")
        .ok_or_else(|| Error::MalformedField("missing S: channel data marker".into()))?;
    let preamble = &input[..s_marker_pos];

    let mut source_type = None;
    let mut live_time = 0.0f32;
    let mut real_time = 0.0f32;
    let mut calibration_coeffs = None;
    let mut deviation_pairs = None;
    let mut model = None;
    let mut start_time = None;
    let mut gps = None;
    let mut neutron_sum = None;
    let mut title = None;

    for token in preamble.split(' ') {
        if token.len() < 2 || token.as_bytes()[1] != b':' {
            continue;
        }
        let (key, value) = (token.as_bytes()[0] as char, &token[2..]);
        match key {
            'I' => {
                source_type = Some(
                    value
                        .chars()
                        .next()
                        .and_then(UriSourceType::from_code)
                        .ok_or_else(|| Error::MalformedField(format!("bad item type: {value}")))?,
                );
            }
            'T' => {
                let parts = split_subfields(value);
                if parts.len() != 2 {
                    return Err(Error::MalformedField("T: field needs live,real".into()));
                }
                live_time = parts[0]
                    .parse()
                    .map_err(|_| Error::MalformedField("bad live time".into()))?;
                real_time = parts[1]
                    .parse()
                    .map_err(|_| Error::MalformedField("bad real time".into()))?;
            }
            'C' => calibration_coeffs = Some(parse_floats(value)?),
            'D' => {
                let flat = parse_floats(value)?;
                deviation_pairs = Some(
                    flat.chunks(2)
                        .filter(|c| c.len() == 2)
                        .map(|c| UriDeviationPair {
                            energy: c[0],
                            offset: c[1],
                        })
                        .collect(),
                );
            }
            'M' => model = Some(value.to_string()),
            'P' => start_time = time_from_string(value, DateOrder::MiddleEndianFirst),
            'G' => {
                let parts = split_subfields(value);
                if parts.len() != 2 {
                    return Err(Error::MalformedField("G: field needs lat,lon".into()));
                }
                let lat: f64 = parts[0]
                    .parse()
                    .map_err(|_| Error::MalformedField("bad latitude".into()))?;
                let lon: f64 = parts[1]
                    .parse()
                    .map_err(|_| Error::MalformedField("bad longitude".into()))?;
                gps = Some((lat, lon));
            }
            'N' => {
                neutron_sum = Some(
                    value
                        .parse()
                        .map_err(|_| Error::MalformedField("bad neutron sum".into()))?,
                );
            }
            'O' => title = Some(value.to_string()),
            _ => {}
        }
    }

    let source_type = source_type.ok_or_else(|| Error::MalformedField("missing I: field".into()))?;

    Ok((
        ParsedFields {
            source_type,
            live_time,
            real_time,
            calibration_coeffs,
            deviation_pairs,
            model,
            start_time,
            gps,
            neutron_sum,
            title,
        },
        s_marker_pos,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_round_trips_basic_fields() {
        let spectrum = UrlSpectrum {
            title: Some("User entered Notes".into()),
            ..UrlSpectrum::new(UriSourceType::Foreground, vec![])
        };
        let preamble = build_preamble(&spectrum, EncodeOptions(0), InheritedFields::default());
        let (parsed, _) = parse_preamble(&format!("{preamble} S:")).unwrap();
        assert_eq!(parsed.source_type, UriSourceType::Foreground);
        assert_eq!(parsed.title.as_deref(), Some("User entered Notes"));
    }

    #[test]
    fn neutralizes_embedded_field_markers() {
        let sanitized = sanitize_free_text("hello S: injected", 60);
        assert!(!sanitized.contains(" S:"));
    }

    #[test]
    fn truncates_free_text_at_byte_cap_on_char_boundary() {
        let long_title = "x".repeat(100);
        let sanitized = sanitize_free_text(&long_title, TITLE_MAX_BYTES);
        assert_eq!(sanitized.len(), TITLE_MAX_BYTES);
    }
}
