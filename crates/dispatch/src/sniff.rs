//! Filename-extension and leading-byte format sniffing

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A spectrum file format [`crate::load_file`] knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    /// IAEA SPE, a tag-driven ASCII format
    Spe,
    /// Binary Ortec SPC, a 128-byte record-pointer container
    Spc,
    /// PCF, a 256-byte fixed-record multi-detector container
    Pcf,
}

fn order_for_extension(path: Option<&Path>) -> Option<FormatHint> {
    let ext = path?.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "spe" => Some(FormatHint::Spe),
        "spc" => Some(FormatHint::Spc),
        "pcf" => Some(FormatHint::Pcf),
        _ => None,
    }
}

fn promote(order: &mut Vec<FormatHint>, hint: FormatHint) {
    if let Some(pos) = order.iter().position(|h| *h == hint) {
        order.remove(pos);
    }
    order.insert(0, hint);
}

/// Deterministic reader trial order for `path`, seeded by its extension and
/// then by the first bytes of `source`
///
/// `source`'s position is restored to its entry point before returning.
pub fn candidate_order(path: Option<&Path>, source: &mut (impl Read + Seek)) -> std::io::Result<Vec<FormatHint>> {
    let start = source.stream_position()?;

    let mut probe = [0u8; 2];
    let read = source.read(&mut probe)?;
    source.seek(SeekFrom::Start(start))?;

    let mut order = vec![FormatHint::Pcf, FormatHint::Spe, FormatHint::Spc];

    if read >= 1 {
        if probe[0] == b'$' {
            promote(&mut order, FormatHint::Spe);
        } else if probe[0] == 0x01 {
            // Binary SPC's first header word (wINFTYP, little-endian i16) is
            // always 1; try it first, PCF falls through on rejection since
            // its own header version word can coincidentally match.
            promote(&mut order, FormatHint::Spc);
            order.retain(|h| *h != FormatHint::Pcf);
            order.push(FormatHint::Pcf);
        }
    }

    if let Some(hint) = order_for_extension(path) {
        promote(&mut order, hint);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn dollar_sign_promotes_spe() {
        let mut cursor = Cursor::new(b"$SPEC_ID:\r\ntest\r\n".to_vec());
        let order = candidate_order(None, &mut cursor).unwrap();
        assert_eq!(order[0], FormatHint::Spe);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn leading_0x01_promotes_spc_over_pcf() {
        let mut cursor = Cursor::new(vec![0x01, 0x00, 0x05, 0x00]);
        let order = candidate_order(None, &mut cursor).unwrap();
        assert_eq!(order[0], FormatHint::Spc);
        assert!(order.iter().position(|h| *h == FormatHint::Spc) < order.iter().position(|h| *h == FormatHint::Pcf));
    }

    #[test]
    fn extension_overrides_byte_sniffing() {
        let mut cursor = Cursor::new(vec![0x01, 0x00]);
        let order = candidate_order(Some(Path::new("a.pcf")), &mut cursor).unwrap();
        assert_eq!(order[0], FormatHint::Pcf);
    }
}
