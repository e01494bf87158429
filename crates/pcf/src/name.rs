//! `<panel><column><mca>[N]` detector name encoding
//!
//! Panel is `A`-`D`, column is `a`-`d`, mca is `1`-`8`, and an optional
//! trailing `N` marks a neutron detector. Deviation pairs are indexed by the
//! 0-based `(panel, column, mca)` triple this module decodes.

use crate::error::{Error, Result};

/// Panel letters in index order
pub const PANELS: usize = 4;
/// Column letters in index order
pub const COLUMNS: usize = 4;
/// MCA digits in index order
pub const MCAS: usize = 8;
/// Deviation pairs carried per detector slot
pub const MAX_DEVIATION_PAIRS: usize = 20;
/// Total addressable `(panel, column, mca)` slots in the deviation-pair table
pub const DEVIATION_SLOTS: usize = PANELS * COLUMNS * MCAS;

/// A decoded `<panel><column><mca>[N]` detector name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorIndex {
    /// 0-based panel index (`A`=0 .. `D`=3)
    pub panel: u8,
    /// 0-based column index (`a`=0 .. `d`=3)
    pub column: u8,
    /// 0-based mca index (`1`=0 .. `8`=7)
    pub mca: u8,
    /// `true` if the name carried a trailing `N`
    pub is_neutron: bool,
}

impl DetectorIndex {
    /// Flat index into a `DEVIATION_SLOTS`-sized table
    pub fn slot(&self) -> usize {
        (self.panel as usize * COLUMNS + self.column as usize) * MCAS + self.mca as usize
    }

    /// `true` when the GADRAS "compressed" (`i16`-pair) deviation table
    /// convention applies: the column letter is `c` or later
    pub fn uses_compressed_deviation_pairs(&self) -> bool {
        self.column >= 2
    }

    /// Render back to `<panel><column><mca>[N]`
    pub fn to_name(&self) -> String {
        let mut name = format!(
            "{}{}{}",
            (b'A' + self.panel) as char,
            (b'a' + self.column) as char,
            (b'1' + self.mca) as char,
        );
        if self.is_neutron {
            name.push('N');
        }
        name
    }
}

/// Parse a `<panel><column><mca>[N]` name into its components
pub fn parse_detector_name(name: &str) -> Result<DetectorIndex> {
    let bytes = name.as_bytes();
    let (panel_b, column_b, mca_b) = match bytes {
        [p, c, m] | [p, c, m, b'N'] => (*p, *c, *m),
        _ => return Err(Error::UnrecognisedDetectorName(name.to_string())),
    };

    if !(b'A'..=b'D').contains(&panel_b) || !(b'a'..=b'd').contains(&column_b) || !(b'1'..=b'8').contains(&mca_b) {
        return Err(Error::UnrecognisedDetectorName(name.to_string()));
    }

    Ok(DetectorIndex {
        panel: panel_b - b'A',
        column: column_b - b'a',
        mca: mca_b - b'1',
        is_neutron: bytes.len() == 4,
    })
}

/// Find `Det=<name>` inside free text (e.g. a measurement title) and parse it
///
/// Used to recover a detector name when the fixed-width preamble field was
/// left blank by the writing instrument.
pub fn update_detector_name_from_title(title: &str) -> Option<DetectorIndex> {
    let start = title.find("Det=")? + "Det=".len();
    let rest = &title[start..];
    let end = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    parse_detector_name(&rest[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_name_components() {
        let idx = parse_detector_name("Bc3").unwrap();
        assert_eq!(idx, DetectorIndex { panel: 1, column: 2, mca: 2, is_neutron: false });
        assert_eq!(idx.to_name(), "Bc3");
        assert!(idx.uses_compressed_deviation_pairs());
    }

    #[test]
    fn trailing_n_marks_neutron_detector() {
        let idx = parse_detector_name("Aa1N").unwrap();
        assert!(idx.is_neutron);
        assert_eq!(idx.to_name(), "Aa1N");
        assert!(!idx.uses_compressed_deviation_pairs());
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(parse_detector_name("Zz9").is_err());
        assert!(parse_detector_name("A1").is_err());
    }

    #[test]
    fn slot_index_is_unique_per_triple() {
        let a = parse_detector_name("Aa1").unwrap().slot();
        let b = parse_detector_name("Ba1").unwrap().slot();
        let c = parse_detector_name("Ab1").unwrap().slot();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn recovers_name_from_title_fallback() {
        let idx = update_detector_name_from_title("run 12 Det=Cb4 foreground").unwrap();
        assert_eq!(idx.to_name(), "Cb4");
        assert!(update_detector_name_from_title("no detector tag here").is_none());
    }
}
