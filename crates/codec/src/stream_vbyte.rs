//! StreamVByte integer packing
//!
//! A little-endian `u16` integer count, followed by `ceil(n/4)` control
//! bytes (two bits per integer selecting a 1-4 byte width), followed by the
//! packed little-endian integer bytes themselves.

use crate::error::{Error, Result};

/// Encode up to 65535 integers into the StreamVByte wire format
pub fn encode(values: &[u32]) -> Result<Vec<u8>> {
    if values.len() > u16::MAX as usize {
        return Err(Error::StreamVByteTooManyIntegers(values.len()));
    }

    let count = values.len();
    let num_control_bytes = count.div_ceil(4);

    let mut out = vec![0u8; 2 + num_control_bytes];
    out[0] = (count & 0x00FF) as u8;
    out[1] = ((count & 0xFF00) >> 8) as u8;

    for (i, &val) in values.iter().enumerate() {
        let bytes = val.to_le_bytes();
        let width = if val < 256 {
            1
        } else if val < 65_536 {
            2
        } else if val < 16_777_216 {
            3
        } else {
            4
        };
        out.extend_from_slice(&bytes[..width]);

        let ctrl_val = (width - 1) as u8;
        let ctrl_byte = i / 4;
        let ctrl_shift = 2 * (i % 4);
        out[2 + ctrl_byte] |= ctrl_val << ctrl_shift;
    }

    Ok(out)
}

/// Decode a StreamVByte buffer, returning the integers and the number of
/// bytes consumed
pub fn decode(input: &[u8]) -> Result<(Vec<u32>, usize)> {
    if input.len() < 2 {
        return Err(Error::StreamVByteMissingCount);
    }

    let count = input[0] as usize | ((input[1] as usize) << 8);
    let num_control_bytes = count.div_ceil(4);

    if input.len() < 2 + num_control_bytes {
        return Err(Error::StreamVByteMissingControlBytes);
    }

    let control = &input[2..2 + num_control_bytes];
    let mut data = &input[2 + num_control_bytes..];
    let mut values = Vec::with_capacity(count);

    for i in 0..count {
        let ctrl_byte = i / 4;
        let ctrl_shift = 2 * (i % 4);
        let width = ((control[ctrl_byte] >> ctrl_shift) & 0x03) as usize + 1;

        if data.len() < width {
            return Err(Error::StreamVByteTruncated(i));
        }

        let mut bytes = [0u8; 4];
        bytes[..width].copy_from_slice(&data[..width]);
        values.push(u32::from_le_bytes(bytes));
        data = &data[width..];
    }

    let consumed = input.len() - data.len();
    Ok((values, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_width_integers() {
        let values = vec![0, 255, 256, 65_535, 65_536, 16_777_215, 16_777_216, u32::MAX];
        let encoded = encode(&values).unwrap();
        let (decoded, consumed) = decode(&encoded).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn empty_input_round_trips() {
        let encoded = encode(&[]).unwrap();
        assert_eq!(encoded, vec![0u8, 0u8]);
        let (decoded, consumed) = decode(&encoded).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(consumed, 2);
    }

    #[test]
    fn rejects_more_than_65535_integers() {
        let values = vec![1u32; 65_536];
        assert!(encode(&values).is_err());
    }

    #[test]
    fn rejects_truncated_input() {
        let encoded = encode(&[1, 2, 3, 4, 5]).unwrap();
        assert!(decode(&encoded[..encoded.len() - 1]).is_err());
    }
}
