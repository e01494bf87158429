//! Encoding and decoding of the `S:` channel-data region

use crate::error::{Error, Result};
use crate::types::EncodeOptions;
use specio_codec::{compress_to_counted_zeros, expand_counted_zeros, stream_vbyte_decode, stream_vbyte_encode};

fn separator(options: EncodeOptions) -> char {
    let final_stage_is_raw_text =
        options.has(EncodeOptions::NO_DEFLATE) && options.has(EncodeOptions::NO_BASEX_ENCODING);
    if final_stage_is_raw_text {
        '$'
    } else {
        ','
    }
}

/// Encode channel counts into the bytes that follow the `S:` marker
pub fn encode(counts: &[u32], options: EncodeOptions) -> Result<Vec<u8>> {
    let floats: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    let compressed = if options.has(EncodeOptions::NO_ZERO_COMPRESS_COUNTS) {
        floats
    } else {
        compress_to_counted_zeros(&floats)
    };

    if options.has(EncodeOptions::CSV_CHANNEL_DATA) {
        let sep = separator(options);
        let text = compressed
            .iter()
            .map(|v| format!("{}", *v as i64))
            .collect::<Vec<_>>()
            .join(&sep.to_string());
        Ok(text.into_bytes())
    } else {
        let mut ints = Vec::with_capacity(compressed.len());
        for v in compressed {
            if !(0.0..=u32::MAX as f64).contains(&v) {
                return Err(Error::ChannelCountTooLarge(v as u32));
            }
            ints.push(v as u32);
        }
        Ok(stream_vbyte_encode(&ints)?)
    }
}

/// Decode the bytes following an `S:` marker back into channel counts
pub fn decode(region: &[u8], options: EncodeOptions) -> Result<Vec<u32>> {
    let floats: Vec<f64> = if options.has(EncodeOptions::CSV_CHANNEL_DATA) {
        let text = std::str::from_utf8(region)
            .map_err(|_| Error::MalformedField("channel data is not valid UTF-8".into()))?;
        let sep = separator(options);
        text.split(sep)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| Error::MalformedField(format!("bad channel value: {s}")))
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        let (ints, _) = stream_vbyte_decode(region)?;
        ints.into_iter().map(|v| v as f64).collect()
    };

    let expanded = if options.has(EncodeOptions::NO_ZERO_COMPRESS_COUNTS) {
        floats
    } else {
        expand_counted_zeros(&floats)?
    };

    Ok(expanded.into_iter().map(|v| v.round().max(0.0) as u32).collect())
}
