//! Whitespace-delimited numeric line splitting
//!
//! Several spectrum formats write channel data as a run of floating-point
//! tokens separated by arbitrary whitespace, occasionally with a Fortran-style
//! exponent missing its `E` (`1.234-08` meaning `1.234E-08`). Some Cambio
//! exports additionally rely on the convention that a zero written with a
//! decimal point (`0.000`) is a genuine small value saved by a
//! zero-compression pass upstream, while a bare `0` is a true zero.

use nom::character::complete::{digit1, multispace0, multispace1, one_of};
use nom::combinator::{opt, recognize};
use nom::multi::separated_list0;
use nom::sequence::tuple;
use nom::IResult;

/// Smallest positive normal `f32`, reused as the "true zero" placeholder
/// value the Cambio zero-compression fix substitutes for `0.000`.
pub const FLT_MIN: f64 = f32::MIN_POSITIVE as f64;

/// Behavior switches for [`split_to_floats`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitOptions {
    /// Apply the Cambio zero-compress fix: a token that parses to zero but
    /// was written with a decimal point (and is not the bare literal `0`)
    /// is replaced with [`FLT_MIN`] rather than `0.0`.
    pub cambio_zero_fix: bool,
}

/// Recognize one numeric token, tolerating a Fortran-style exponent with a
/// missing `E`/`e` (a bare sign directly after the mantissa).
fn numeric_token(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(tuple((nom::character::complete::char('.'), digit1))),
        opt(tuple((opt(one_of("eE")), one_of("+-"), digit1))),
    )))(input)
}

fn repair_broken_exponent(token: &str) -> String {
    // "1.234-08" -> "1.234E-08"; only when an explicit E/e was absent and a
    // sign character appears after the mantissa's first digit.
    if token.contains(['e', 'E']) {
        return token.to_string();
    }
    let bytes = token.as_bytes();
    for (i, b) in bytes.iter().enumerate().skip(1) {
        if (*b == b'+' || *b == b'-') && bytes[i - 1] != b'.' {
            let (mantissa, exponent) = token.split_at(i);
            return format!("{mantissa}E{exponent}");
        }
    }
    token.to_string()
}

fn parse_line(input: &str) -> IResult<&str, Vec<&str>> {
    let (input, _) = multispace0(input)?;
    separated_list0(multispace1, numeric_token)(input)
}

/// Split whitespace-delimited floating point tokens out of `line`
///
/// Malformed tokens are skipped rather than aborting the whole line, since
/// source files in the wild occasionally interleave stray non-numeric
/// tokens (units, footnotes) that downstream callers are expected to ignore.
pub fn split_to_floats(line: &str, options: SplitOptions) -> Vec<f64> {
    let Ok((_, tokens)) = parse_line(line.trim_end()) else {
        return Vec::new();
    };

    tokens
        .into_iter()
        .filter_map(|raw| {
            let repaired = repair_broken_exponent(raw);
            let value: f64 = repaired.parse().ok()?;
            if options.cambio_zero_fix && value == 0.0 && raw.contains('.') && raw.trim_start_matches(['+', '-']) != "0" {
                Some(FLT_MIN)
            } else {
                Some(value)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_whitespace_separated_floats() {
        let values = split_to_floats("1.0 2.5  3", SplitOptions::default());
        assert_eq!(values, vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn repairs_fortran_style_missing_exponent() {
        let values = split_to_floats("1.234-08 5.0+02", SplitOptions::default());
        assert!((values[0] - 1.234e-8).abs() < 1e-12);
        assert!((values[1] - 5.0e2).abs() < 1e-9);
    }

    #[test]
    fn cambio_zero_fix_distinguishes_decimal_zero() {
        let opts = SplitOptions { cambio_zero_fix: true };
        let values = split_to_floats("0 0.000", opts);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], FLT_MIN);
    }

    #[test]
    fn cambio_zero_fix_leaves_bare_zero_alone_without_flag() {
        let values = split_to_floats("0 0.000", SplitOptions::default());
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 0.0);
    }
}
