//! Assembly of `raddata://G0/...` URIs from one or more spectra

use crate::channel;
use crate::error::{Error, Result};
use crate::payload::{build_preamble, InheritedFields};
use crate::types::{EncodeOptions, UrlSpectrum};
use specio_codec::{base45_encode, base64url_encode, crc16_arc, deflate_compress, percent_encode_mailto, percent_encode_qr};

const MULTI_SPECTRUM_SEPARATOR: &str = ":0A:";

fn inherited_fields(first: &UrlSpectrum, other: &UrlSpectrum) -> InheritedFields {
    InheritedFields {
        model: first.model == other.model,
        calibration: first.calibration_coeffs == other.calibration_coeffs
            && first.deviation_pairs == other.deviation_pairs,
        gps: first.gps == other.gps,
        title: first.title == other.title,
    }
}

fn spectrum_payload(spectrum: &UrlSpectrum, options: EncodeOptions, inherited: InheritedFields) -> Result<Vec<u8>> {
    let preamble = build_preamble(spectrum, options, inherited);
    let channel_bytes = channel::encode(&spectrum.channel_data, options)?;

    let mut out = preamble.into_bytes();
    out.extend_from_slice(b"S:");
    out.extend_from_slice(&channel_bytes);
    Ok(out)
}

fn basex_encode(bytes: &[u8], options: EncodeOptions) -> String {
    if options.has(EncodeOptions::NO_BASEX_ENCODING) {
        String::from_utf8_lossy(bytes).into_owned()
    } else if options.has(EncodeOptions::USE_URL_SAFE_BASE64) {
        base64url_encode(bytes, false)
    } else {
        base45_encode(bytes)
    }
}

fn percent_encode(input: &str, options: EncodeOptions) -> String {
    if options.has(EncodeOptions::AS_MAILTO_URI) {
        percent_encode_mailto(input)
    } else {
        percent_encode_qr(input)
    }
}

fn options_prefix(options: EncodeOptions) -> String {
    if options.has(EncodeOptions::AS_MAILTO_URI) {
        format!("{:02X}", options.written_byte())
    } else {
        format!("{:X}", options.written_byte())
    }
}

/// Encode one or more spectra into `num_parts` URI strings
///
/// `num_parts` must be in `1..=9`. When `spectra.len() > 1`, `num_parts`
/// must be `1`: multiple spectra are joined into a single part with the
/// `:0A:` separator instead.
pub fn encode_spectra(spectra: &[UrlSpectrum], options: EncodeOptions, num_parts: usize) -> Result<Vec<String>> {
    if !(1..=9).contains(&num_parts) {
        return Err(Error::InvalidPartCount(num_parts));
    }
    if spectra.is_empty() {
        return Err(Error::MalformedField("no spectra given".into()));
    }
    if spectra.len() > 1 && num_parts != 1 {
        return Err(Error::MultiSpectrumRequiresOnePart);
    }

    let opt_prefix = options_prefix(options);
    let parts_minus_one = num_parts - 1;

    if spectra.len() > 1 {
        let first = &spectra[0];
        let mut joined = spectrum_payload(first, options, InheritedFields::default())?;
        for spectrum in &spectra[1..] {
            joined.extend_from_slice(MULTI_SPECTRUM_SEPARATOR.as_bytes());
            joined.extend_from_slice(&spectrum_payload(spectrum, options, inherited_fields(first, spectrum))?);
        }

        let wire = if options.has(EncodeOptions::NO_DEFLATE) {
            joined
        } else {
            deflate_compress(&joined)?
        };
        let basex = basex_encode(&wire, options);
        let encoded = percent_encode(&basex, options);

        let prefix = format!(
            "RADDATA://G0/{opt_prefix}{parts_minus_one:X}{:X}/",
            spectra.len() - 1
        );
        return Ok(vec![format!("{prefix}{encoded}")]);
    }

    let payload = spectrum_payload(&spectra[0], options, InheritedFields::default())?;
    let chunks = split_into_parts(&payload, num_parts);

    let wires: Vec<Vec<u8>> = chunks
        .iter()
        .map(|chunk| {
            if options.has(EncodeOptions::NO_DEFLATE) {
                Ok(chunk.clone())
            } else {
                deflate_compress(chunk)
            }
        })
        .collect::<std::result::Result<Vec<Vec<u8>>, specio_codec::Error>>()?;

    let basex_strings: Vec<String> = wires.iter().map(|w| basex_encode(w, options)).collect();

    let crc = if num_parts > 1 {
        let concatenated: String = basex_strings.concat();
        Some(crc16_arc(concatenated.as_bytes()))
    } else {
        None
    };

    let mut urls = Vec::with_capacity(num_parts);
    for (k, basex) in basex_strings.iter().enumerate() {
        let encoded = percent_encode(basex, options);
        let prefix = if let Some(crc) = crc {
            format!("RADDATA://G0/{opt_prefix}{parts_minus_one:X}{k:X}/{crc}/")
        } else {
            format!("RADDATA://G0/{opt_prefix}{parts_minus_one:X}{k:X}/")
        };
        urls.push(format!("{prefix}{encoded}"));
    }

    Ok(urls)
}

/// Encode a single spectrum into a single URI, the common case
pub fn encode_spectrum(spectrum: &UrlSpectrum, options: EncodeOptions) -> Result<String> {
    let mut urls = encode_spectra(std::slice::from_ref(spectrum), options, 1)?;
    Ok(urls.remove(0))
}

/// Split `payload` into `num_parts` roughly-equal byte chunks, preserving
/// the relative order of bytes (only part 0 will, in practice, carry the
/// key-value preamble since it always sits at the front of `payload`)
fn split_into_parts(payload: &[u8], num_parts: usize) -> Vec<Vec<u8>> {
    if num_parts == 1 {
        return vec![payload.to_vec()];
    }
    let chunk_size = payload.len().div_ceil(num_parts);
    payload
        .chunks(chunk_size.max(1))
        .map(|c| c.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn single_part_uri_starts_with_expected_prefix() {
        let spectrum = sample_spectrum();
        let url = encode_spectrum(&spectrum, EncodeOptions(0)).unwrap();
        assert!(url.starts_with("RADDATA://G0/000/"));
    }

    #[test]
    fn multi_part_uris_share_one_crc() {
        let spectrum = sample_spectrum();
        let urls = encode_spectra(&[spectrum], EncodeOptions(0), 3).unwrap();
        assert_eq!(urls.len(), 3);
        let crcs: Vec<&str> = urls.iter().map(|u| u.split('/').nth(4).unwrap()).collect();
        assert_eq!(crcs[0], crcs[1]);
        assert_eq!(crcs[1], crcs[2]);
        for (k, url) in urls.iter().enumerate() {
            assert!(url.starts_with(&format!("RADDATA://G0/02{k}/")));
        }
    }
}
