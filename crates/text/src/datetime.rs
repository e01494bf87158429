//! Free-form timestamp parsing and formatting

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Which end of an ambiguous `NN/NN/YYYY` date to try first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// Try month-first (`MM/DD/YYYY`) formats before day-first ones
    MiddleEndianFirst,
    /// Try day-first (`DD/MM/YYYY`) formats before month-first ones
    LittleEndianFirst,
    /// Only try day-first formats
    LittleEndianOnly,
    /// Only try month-first formats
    MiddleEndianOnly,
}

/// A microsecond-precision instant in an unspecified local zone
///
/// Any GMT offset present in the source string is parsed and discarded; the
/// result is always expressed in whatever local zone the source string
/// implied, never converted to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(NaiveDateTime);

impl Instant {
    /// Wrap a [`NaiveDateTime`] directly
    pub fn from_naive(naive: NaiveDateTime) -> Self {
        Self(naive)
    }

    /// The underlying naive date-time
    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// `20140414T141201.621543`
    pub fn to_iso_string(&self) -> String {
        format!(
            "{:04}{:02}{:02}T{:02}{:02}{:02}.{:06}",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second(),
            self.0.and_utc().timestamp_subsec_micros()
        )
    }

    /// `04/14/2014 14:12:01`, whole seconds only
    pub fn to_middle_endian_string(&self) -> String {
        format!(
            "{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
            self.0.month(),
            self.0.day(),
            self.0.year(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }

    /// `2014-04-14T14:12:01`, whole seconds only
    pub fn to_iso_seconds_string(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }

    /// `2014-04-14T14:12:01.621543`
    pub fn to_iso_extended_string(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second(),
            self.0.and_utc().timestamp_subsec_micros()
        )
    }

    /// `14-Apr-14 14:12:01`, two-digit year, whole seconds only
    pub fn to_vax_short_string(&self) -> String {
        format!(
            "{:02}-{}-{:02} {:02}:{:02}:{:02}",
            self.0.day(),
            MONTH_ABBREV[self.0.month0() as usize],
            self.0.year().rem_euclid(100),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }

    /// `14-Apr-2014 14:12:01.62`, always exactly 23 characters
    pub fn to_vax_string(&self) -> String {
        let centiseconds = self.0.and_utc().timestamp_subsec_millis() / 10;
        format!(
            "{:02}-{}-{:04} {:02}:{:02}:{:02}.{:02}",
            self.0.day(),
            MONTH_ABBREV[self.0.month0() as usize],
            self.0.year(),
            self.0.hour(),
            self.0.minute(),
            self.0.second(),
            centiseconds
        )
    }

    /// `14-Apr-2014 14:12:01 PM`
    pub fn to_common_string(&self) -> String {
        let hour12 = self.0.hour12();
        format!(
            "{:02}-{}-{:04} {:02}:{:02}:{:02} {}",
            self.0.day(),
            MONTH_ABBREV[self.0.month0() as usize],
            self.0.year(),
            if hour12.1 == 0 { 12 } else { hour12.1 },
            self.0.minute(),
            self.0.second(),
            if hour12.0 { "PM" } else { "AM" }
        )
    }
}

const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MIDDLE_ENDIAN_FORMATS: &[&str] = &[
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y%m%dT%H%M%S",
    "%d.%m.%Y %H:%M:%S",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%Y-%m-%d",
];

const LITTLE_ENDIAN_FORMATS: &[&str] = &[
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y%m%dT%H%M%S",
    "%d.%m.%Y %H:%M:%S",
    "%d/%m/%Y %I:%M %p",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y",
    "%d-%b-%Y",
    "%Y-%m-%d",
];

fn formats_for(order: DateOrder) -> &'static [&'static str] {
    match order {
        DateOrder::MiddleEndianFirst | DateOrder::MiddleEndianOnly => MIDDLE_ENDIAN_FORMATS,
        DateOrder::LittleEndianFirst | DateOrder::LittleEndianOnly => LITTLE_ENDIAN_FORMATS,
    }
}

/// Upper-case, trim, collapse `_T` separators and double spaces
fn normalize(input: &str) -> String {
    let upper = input.trim().to_uppercase();
    let mut out = String::with_capacity(upper.len());
    let mut chars = upper.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' && chars.peek() == Some(&'T') {
            out.push('T');
            chars.next();
            continue;
        }
        out.push(c);
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut prev_space = false;
    for c in out.chars() {
        if c == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        collapsed.push(c);
    }
    collapsed
}

/// Strip a trailing `±HH:MM` GMT offset, returning the remainder. The
/// offset itself is discarded; results are always in the original local
/// zone.
fn strip_gmt_offset(input: &str) -> &str {
    let bytes = input.as_bytes();
    if bytes.len() < 6 {
        return input;
    }
    let tail = &input[input.len() - 6..];
    let tail_bytes = tail.as_bytes();
    let sign_ok = tail_bytes[0] == b'+' || tail_bytes[0] == b'-';
    let digits_ok = tail_bytes[1].is_ascii_digit()
        && tail_bytes[2].is_ascii_digit()
        && tail_bytes[3] == b':'
        && tail_bytes[4].is_ascii_digit()
        && tail_bytes[5].is_ascii_digit();
    if sign_ok && digits_ok {
        input[..input.len() - 6].trim_end()
    } else {
        input
    }
}

/// Strip a trailing fractional-second suffix (`.123456789`), returning the
/// remainder and the fractional seconds in nanoseconds
fn strip_fractional_seconds(input: &str) -> (&str, u32) {
    if let Some(dot) = input.rfind('.') {
        let frac = &input[dot + 1..];
        if !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()) {
            let mut digits = frac.to_string();
            digits.truncate(9);
            while digits.len() < 9 {
                digits.push('0');
            }
            if let Ok(nanos) = digits.parse::<u32>() {
                return (input[..dot].trim_end(), nanos);
            }
        }
    }
    (input, 0)
}

/// Parse a free-form timestamp string
///
/// Returns `None` ("not a valid time") if no format in the list selected by
/// `order` matches.
pub fn time_from_string(input: &str, order: DateOrder) -> Option<Instant> {
    let normalized = normalize(input);
    let stripped = strip_gmt_offset(&normalized);
    let (base, nanos) = strip_fractional_seconds(stripped);

    // Legacy strptime workaround: years 2031-2099 are shifted back 100
    // years before parsing and restored afterward.
    let (shifted, year_shift) = shift_year_if_needed(base);

    for fmt in formats_for(order) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&shifted, fmt) {
            return Some(finish(dt, nanos, year_shift));
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(&shifted, fmt) {
            let dt = date.and_hms_opt(0, 0, 0)?;
            return Some(finish(dt, nanos, year_shift));
        }
    }
    None
}

fn finish(dt: NaiveDateTime, nanos: u32, year_shift: i32) -> Instant {
    let dt = dt
        .date()
        .and_hms_nano_opt(dt.hour(), dt.minute(), dt.second(), nanos)
        .unwrap_or(dt);
    let dt = if year_shift != 0 {
        shift_years(dt, year_shift)
    } else {
        dt
    };
    Instant(dt)
}

fn shift_years(dt: NaiveDateTime, years: i32) -> NaiveDateTime {
    let target_year = dt.year() + years;
    dt.with_year(target_year).unwrap_or(dt)
}

/// Detects a 4-digit year token in `2031..=2099` within `input` and, if
/// found, rewrites it 100 years earlier. Returns the possibly-rewritten
/// string and the shift that must be added back after parsing (0 or 100).
fn shift_year_if_needed(input: &str) -> (String, i32) {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i + 4 <= bytes.len() {
        if bytes[i..i + 4].iter().all(|b| b.is_ascii_digit()) {
            let is_boundary_before = i == 0 || !bytes[i - 1].is_ascii_digit();
            let is_boundary_after = i + 4 == bytes.len() || !bytes[i + 4].is_ascii_digit();
            if is_boundary_before && is_boundary_after {
                if let Ok(year) = input[i..i + 4].parse::<u32>() {
                    if (2031..=2099).contains(&year) {
                        let mut out = input.to_string();
                        out.replace_range(i..i + 4, &format!("{:04}", year - 100));
                        return (out, 100);
                    }
                }
            }
        }
        i += 1;
    }
    (input.to_string(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_extended_formatting_matches_reference() {
        let dt = chrono::NaiveDate::from_ymd_opt(2014, 4, 14)
            .unwrap()
            .and_hms_micro_opt(14, 12, 1, 621543)
            .unwrap();
        let instant = Instant::from_naive(dt);
        assert_eq!(instant.to_iso_extended_string(), "2014-04-14T14:12:01.621543");
        assert_eq!(instant.to_iso_string(), "20140414T141201.621543");
        assert_eq!(instant.to_vax_string(), "14-Apr-2014 14:12:01.62");
        assert_eq!(instant.to_vax_string().len(), 23);
        assert_eq!(instant.to_middle_endian_string(), "04/14/2014 14:12:01");
        assert_eq!(instant.to_vax_short_string(), "14-Apr-14 14:12:01");
    }

    #[test]
    fn ambiguous_date_resolves_by_requested_order() {
        let a = time_from_string("02/29/2016 14:31:47", DateOrder::MiddleEndianFirst).unwrap();
        let b = time_from_string("29/02/2016 14:31:47", DateOrder::LittleEndianFirst).unwrap();
        assert_eq!(a, b);

        assert!(time_from_string("02/29/2016", DateOrder::LittleEndianOnly).is_none());
    }

    #[test]
    fn strips_gmt_offset_and_keeps_local_fields() {
        let a = time_from_string("2014-04-14 14:12:01+02:00", DateOrder::MiddleEndianFirst).unwrap();
        let b = time_from_string("2014-04-14 14:12:01", DateOrder::MiddleEndianFirst).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn legacy_year_workaround_round_trips() {
        let instant =
            time_from_string("2045-06-01 10:00:00", DateOrder::MiddleEndianFirst).unwrap();
        assert_eq!(instant.naive().year(), 2045);
    }

    #[test]
    fn rejects_unparsable_input() {
        assert!(time_from_string("not a date", DateOrder::MiddleEndianFirst).is_none());
    }
}
