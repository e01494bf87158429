//! Parsing of `raddata://G0/...` and `mailto:` spectrum URIs

use crate::channel;
use crate::error::{Error, Result};
use crate::payload::parse_preamble;
use crate::types::{EncodeOptions, UrlSpectrum};
use specio_codec::{base45_decode, base64url_decode, crc16_arc, deflate_decompress, percent_decode};

const MULTI_SPECTRUM_SEPARATOR: &str = ":0A:";

fn normalize_prefix(input: &str) -> Result<&str> {
    let input = match input.find("raddata://g0/") {
        Some(_) => input,
        None => input,
    };

    let lower = input.to_ascii_lowercase();
    for scheme in ["raddata://g0/", "interspec://g0/", "raddata:g0/"] {
        if let Some(pos) = lower.find(scheme) {
            return Ok(&input[pos + scheme.len()..]);
        }
    }
    Err(Error::NotASpectrumUri)
}

fn hex_digit(c: u8) -> Result<u8> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| Error::MalformedField("expected a hex digit".into()))
}

/// Parse the `<OPT><NPARTS-1><IDX-or-NSPEC-1>/` header, returning the
/// decoded fields and the remainder of the string after its trailing `/`
fn parse_header(rest: &str) -> Result<(EncodeOptions, u8, u8, &str)> {
    let bytes = rest.as_bytes();
    if bytes.len() < 4 {
        return Err(Error::MalformedField("URI header too short".into()));
    }

    let has_email_opt = bytes[3] != b'/';
    let (raw_options, nparts_digit, idx_digit, remainder) = if has_email_opt {
        if bytes.len() < 5 || bytes[4] != b'/' {
            return Err(Error::MalformedField("options not terminated with '/'".into()));
        }
        let opt = (hex_digit(bytes[0])? << 4) | hex_digit(bytes[1])?;
        (opt, hex_digit(bytes[2])?, hex_digit(bytes[3])?, &rest[5..])
    } else {
        let opt = hex_digit(bytes[0])?;
        (opt, hex_digit(bytes[1])?, hex_digit(bytes[2])?, &rest[4..])
    };

    let masked = raw_options & !EncodeOptions::AS_MAILTO_URI;
    if masked & !EncodeOptions::ALL_KNOWN_BITS != 0 {
        return Err(Error::UnknownOptionBit(masked));
    }

    Ok((EncodeOptions(masked), nparts_digit, idx_digit, remainder))
}

fn take_field(input: &str) -> Result<(&str, &str)> {
    let slash = input
        .find('/')
        .ok_or_else(|| Error::MalformedField("missing '/' delimiter".into()))?;
    Ok((&input[..slash], &input[slash + 1..]))
}

fn basex_decode(input: &str, options: EncodeOptions) -> Result<Vec<u8>> {
    if options.has(EncodeOptions::NO_BASEX_ENCODING) {
        Ok(input.as_bytes().to_vec())
    } else if options.has(EncodeOptions::USE_URL_SAFE_BASE64) {
        Ok(base64url_decode(input)?)
    } else {
        Ok(base45_decode(input)?)
    }
}

/// Find the first occurrence of `needle` in `haystack`
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_one_payload(bytes: &[u8], options: EncodeOptions) -> Result<UrlSpectrum> {
    let s_marker_pos = find_bytes(bytes, b"S:")
        .ok_or_else(|| Error::MalformedField("missing S: channel data marker".into()))?;
    let preamble = std::str::from_utf8(&bytes[..s_marker_pos])
        .map_err(|_| Error::MalformedField("preamble is not valid UTF-8".into()))?;
    let (fields, _) = parse_preamble(&format!("{preamble}S:"))?;

    let region = &bytes[s_marker_pos + 2..];
    let channel_data = channel::decode(region, options)?;

    Ok(UrlSpectrum {
        source_type: fields.source_type,
        live_time: fields.live_time,
        real_time: fields.real_time,
        calibration_coeffs: fields.calibration_coeffs.unwrap_or_default(),
        deviation_pairs: fields.deviation_pairs.unwrap_or_default(),
        model: fields.model,
        start_time: fields.start_time,
        gps: fields.gps,
        neutron_sum: fields.neutron_sum,
        title: fields.title,
        channel_data,
    })
}

/// A single decoded part, before cross-part reassembly
struct DecodedUri<'a> {
    options: EncodeOptions,
    num_parts: usize,
    part_index_or_spectrum_count: usize,
    crc: Option<u16>,
    basex_payload: &'a str,
}

fn strip_mailto_front_matter(input: &str) -> &str {
    for scheme in ["raddata://", "RADDATA://", "INTERSPEC://", "raddata:"] {
        if let Some(pos) = input.find(scheme) {
            return &input[pos..];
        }
    }
    input
}

fn parse_one_uri(uri: &str) -> Result<DecodedUri<'_>> {
    let uri = strip_mailto_front_matter(uri);
    let rest = normalize_prefix(uri)?;
    let (options, parts_minus_one, idx_digit, rest) = parse_header(rest)?;
    let num_parts = parts_minus_one as usize + 1;

    let (rest, crc) = if num_parts > 1 {
        let (crc_field, remainder) = take_field(rest)?;
        let crc: u16 = crc_field
            .parse()
            .map_err(|_| Error::MalformedField("bad CRC field".into()))?;
        (remainder, Some(crc))
    } else {
        (rest.strip_prefix('/').unwrap_or(rest), None)
    };

    Ok(DecodedUri {
        options,
        num_parts,
        part_index_or_spectrum_count: idx_digit as usize,
        crc,
        basex_payload: rest,
    })
}

fn recover_basex(encoded: &str, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut candidate = percent_decode(encoded)?;
    for _ in 0..3 {
        if let Ok(bytes) = basex_decode(&candidate, options) {
            if options.has(EncodeOptions::NO_DEFLATE) {
                return Ok(bytes);
            }
            if let Ok(decompressed) = deflate_decompress(&bytes) {
                return Ok(decompressed);
            }
        }
        // Tolerate double URL-encoded input from mail clients.
        candidate = percent_decode(&candidate)?;
    }

    let mut trimmed = candidate.clone();
    while !trimmed.is_empty() {
        if let Ok(bytes) = basex_decode(trimmed.trim_end(), options) {
            let result = if options.has(EncodeOptions::NO_DEFLATE) {
                Ok(bytes)
            } else {
                deflate_decompress(&bytes).map_err(Error::from)
            };
            if let Ok(value) = result {
                return Ok(value);
            }
        }
        trimmed.pop();
    }

    Err(Error::MalformedField("could not decode base-X/deflate payload".into()))
}

/// Decode every spectrum carried by `uri`
pub fn decode_spectrum_urls(uri: &str) -> Result<Vec<UrlSpectrum>> {
    let parsed = parse_one_uri(uri)?;

    if parsed.num_parts > 1 {
        return Err(Error::MalformedField(
            "decode_spectrum_urls requires all parts; use decode_spectrum_url_parts".into(),
        ));
    }

    let raw = recover_basex(parsed.basex_payload, parsed.options)?;
    decode_payload_bytes(&raw, parsed.options)
}

fn decode_payload_bytes(raw: &[u8], options: EncodeOptions) -> Result<Vec<UrlSpectrum>> {
    let mut spectra = Vec::new();
    let mut rest: &[u8] = raw;

    loop {
        if let Some(sep_pos) = find_bytes(rest, MULTI_SPECTRUM_SEPARATOR.as_bytes()) {
            let chunk = &rest[..sep_pos];
            let spectrum = parse_one_payload(chunk, options)?;
            spectra.push(spectrum);
            rest = &rest[sep_pos + MULTI_SPECTRUM_SEPARATOR.len()..];
        } else {
            spectra.push(parse_one_payload(rest, options)?);
            break;
        }
    }

    if spectra.len() > 1 {
        let first = spectra[0].clone();
        for spectrum in spectra.iter_mut().skip(1) {
            if spectrum.model.is_none() {
                spectrum.model = first.model.clone();
            }
            if spectrum.calibration_coeffs.is_empty() {
                spectrum.calibration_coeffs = first.calibration_coeffs.clone();
            }
            if spectrum.deviation_pairs.is_empty() {
                spectrum.deviation_pairs = first.deviation_pairs.clone();
            }
            if spectrum.gps.is_none() {
                spectrum.gps = first.gps;
            }
            if spectrum.title.is_none() {
                spectrum.title = first.title.clone();
            }
        }
    }

    Ok(spectra)
}

/// Decode a spectrum split across multiple parts
///
/// `parts` must contain every `RADDATA://G0/<OPT><N-1><K>/<CRC16>/...`
/// fragment, in any order; they are sorted by their embedded index before
/// reassembly.
pub fn decode_spectrum_url_parts(parts: &[&str]) -> Result<Vec<UrlSpectrum>> {
    let mut decoded: Vec<DecodedUri> = parts.iter().map(|p| parse_one_uri(p)).collect::<Result<_>>()?;
    decoded.sort_by_key(|d| d.part_index_or_spectrum_count);

    let num_parts = decoded.first().map(|d| d.num_parts).unwrap_or(1);
    if decoded.len() != num_parts {
        return Err(Error::MalformedField(format!(
            "expected {num_parts} parts, got {}",
            decoded.len()
        )));
    }

    let options = decoded[0].options;
    let expected_crc = decoded[0].crc;

    if let Some(expected) = expected_crc {
        let concatenated: String = decoded.iter().map(|d| d.basex_payload).collect();
        let actual = crc16_arc(concatenated.as_bytes());
        if actual != expected {
            return Err(Error::CrcMismatch { expected, actual });
        }
    }

    let mut raw = Vec::new();
    for part in &decoded {
        raw.extend(recover_basex(part.basex_payload, options)?);
    }

    decode_payload_bytes(&raw, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode_spectra, encode_spectrum};
    use crate::types::UriSourceType;

    fn sample_spectrum() -> UrlSpectrum {
        let mut spectrum = UrlSpectrum::new(UriSourceType::Foreground, (0..128).collect());
        spectrum.calibration_coeffs = vec![0.0, 3.0];
        spectrum.live_time = 295.1;
        spectrum.real_time = 300.0;
        spectrum.neutron_sum = Some(5.0);
        spectrum.title = Some("User entered Notes".into());
        spectrum
    }

    #[test]
    fn round_trips_a_single_part_uri() {
        let spectrum = sample_spectrum();
        let url = encode_spectrum(&spectrum, EncodeOptions(0)).unwrap();
        let decoded = decode_spectrum_urls(&url).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].channel_data, spectrum.channel_data);
        assert_eq!(decoded[0].title, spectrum.title);
    }

    #[test]
    fn round_trips_a_multi_part_uri_in_any_order() {
        let spectrum = sample_spectrum();
        let mut urls = encode_spectra(&[spectrum.clone()], EncodeOptions(0), 3).unwrap();
        urls.swap(0, 2);
        let refs: Vec<&str> = urls.iter().map(|s| s.as_str()).collect();
        let decoded = decode_spectrum_url_parts(&refs).unwrap();
        assert_eq!(decoded[0].channel_data, spectrum.channel_data);
    }
}
