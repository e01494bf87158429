//! Heuristic identification of the Ortec Detective submodel from free text
//! carried in the acquisition-record instrument name or serial number
//!
//! This mirrors the digit-range fallback of a vendor-maintained serial
//! number table: where the real table isn't available, a plausible submodel
//! is still guessed from the text itself.

/// An Ortec Detective product-line submodel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectiveSubmodel {
    /// Handheld MicroDetective
    MicroDetective,
    /// Detective-EX / DX
    DetectiveEx,
    /// Detective-EX100 / DX100
    DetectiveEx100,
    /// Detective200
    Detective200,
}

impl DetectiveSubmodel {
    /// Instrument model label in the style of the original vendor string
    pub fn label(&self) -> &'static str {
        match self {
            DetectiveSubmodel::MicroDetective => "MicroDetective",
            DetectiveSubmodel::DetectiveEx => "DetectiveEX",
            DetectiveSubmodel::DetectiveEx100 => "DetectiveEX100",
            DetectiveSubmodel::Detective200 => "Detective200",
        }
    }
}

/// Guess a submodel from instrument name or serial number text
///
/// Checks for `"micro"`/`"udet"`/`"hx"`/`"udx"` substrings first, then
/// `"100"`/`"200"`, then falls back to scanning embedded digit runs for a
/// value in the `500..4000` (EX) or `4000..5000` (EX100) ranges.
pub fn guess_submodel(text: &str) -> Option<DetectiveSubmodel> {
    let lower = text.to_ascii_lowercase();
    if ["micro", "udet", "hx", "udx"].iter().any(|needle| lower.contains(needle)) {
        return Some(DetectiveSubmodel::MicroDetective);
    }
    if lower.contains("100") {
        return Some(DetectiveSubmodel::DetectiveEx100);
    }
    if lower.contains("200") {
        return Some(DetectiveSubmodel::Detective200);
    }

    for run in digit_runs(text) {
        if let Ok(value) = run.parse::<u32>() {
            if (500..4000).contains(&value) {
                return Some(DetectiveSubmodel::DetectiveEx);
            }
            if (4000..5000).contains(&value) {
                return Some(DetectiveSubmodel::DetectiveEx100);
            }
        }
    }
    None
}

fn digit_runs(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_digit()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_micro_detective_aliases() {
        assert_eq!(guess_submodel("uDX-1422"), Some(DetectiveSubmodel::MicroDetective));
        assert_eq!(guess_submodel("MicroDetective"), Some(DetectiveSubmodel::MicroDetective));
    }

    #[test]
    fn recognises_explicit_model_numbers() {
        assert_eq!(guess_submodel("DetectiveEX100"), Some(DetectiveSubmodel::DetectiveEx100));
        assert_eq!(guess_submodel("Detective200"), Some(DetectiveSubmodel::Detective200));
    }

    #[test]
    fn falls_back_to_serial_number_range() {
        assert_eq!(guess_submodel("SN 1422"), Some(DetectiveSubmodel::DetectiveEx));
        assert_eq!(guess_submodel("SN 4410"), Some(DetectiveSubmodel::DetectiveEx100));
        assert_eq!(guess_submodel("SN 42"), None);
    }
}
