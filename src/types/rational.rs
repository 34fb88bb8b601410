//! Exact fraction arithmetic for rhythm values.
//!
//! All beat positions and durations in the model are `Rational`, never
//! floats: three triplet eighths must sum to exactly one quarter note.
//! Durations at this layer are measured in whole notes; the rhythm analyzer
//! rescales to the caller's timebase.

use crate::errors::ModelError;
use num_traits::Zero;

pub type Rational = num_rational::Rational64;

/// Checked construction. `Rational::new` panics on a zero denominator, so
/// model code that derives a fraction from input goes through here.
pub fn rational(numer: i64, denom: i64) -> Result<Rational, ModelError> {
    if denom == 0 {
        return Err(ModelError::Arithmetic);
    }
    Ok(Rational::new(numer, denom))
}

/// Checked division. `Ratio` panics when the divisor is zero.
pub fn checked_div(lhs: Rational, rhs: Rational) -> Result<Rational, ModelError> {
    if rhs.is_zero() {
        return Err(ModelError::Arithmetic);
    }
    Ok(lhs / rhs)
}

/// Parse a `**recip` rhythm code into a duration in whole-note units.
///
/// `4` is a quarter (1/4 whole), `12` a triplet eighth (1/12), `2%3` is
/// 3/2 whole notes, and each trailing dot adds half of the previous value.
/// `0` is a breve, each further zero doubling again. Grace notes carry no
/// digits here; callers handle `q` before calling.
/// Longest augmentation-dot run accepted; keeps the dot scale within i64.
const MAX_DOTS: usize = 15;
/// "0" breve, "00" long, "000" maxima; nothing longer is a rhythm.
const MAX_ZEROS: usize = 3;

pub fn parse_rhythm_code(code: &str) -> Result<Rational, ModelError> {
    let dots = code.chars().rev().take_while(|&c| c == '.').count();
    if dots > MAX_DOTS {
        return Err(ModelError::Arithmetic);
    }
    let body = &code[..code.len() - dots];

    let base = if let Some((n, m)) = body.split_once('%') {
        let numer: i64 = m.parse().map_err(|_| ModelError::Arithmetic)?;
        let denom: i64 = n.parse().map_err(|_| ModelError::Arithmetic)?;
        rational(numer, denom)?
    } else {
        let value: i64 = body.parse().map_err(|_| ModelError::Arithmetic)?;
        if value == 0 {
            if body.len() > MAX_ZEROS {
                return Err(ModelError::Arithmetic);
            }
            Rational::from_integer(1i64 << body.len())
        } else {
            rational(1, value)?
        }
    };

    // k dots multiply by (2 - 2^-k)
    let scale = rational((1i64 << (dots + 1)) - 1, 1i64 << dots)?;
    Ok(base * scale)
}

/// Inverse of [`parse_rhythm_code`]: render a whole-note duration as a
/// rhythm code, preferring the fewest dots. Returns `None` for zero or
/// negative durations.
pub fn rhythm_code(duration: Rational) -> Option<String> {
    if duration <= Rational::zero() {
        return None;
    }
    for dots in 0..=3usize {
        let scale = Rational::new((1i64 << (dots + 1)) - 1, 1i64 << dots);
        let base = duration / scale;
        if *base.numer() == 1 {
            return Some(format!("{}{}", base.denom(), ".".repeat(dots)));
        }
        // breve family: 2 -> "0", 4 -> "00", 8 -> "000"
        if *base.denom() == 1 && base.numer().count_ones() == 1 {
            let zeros = base.numer().trailing_zeros() as usize;
            return Some(format!("{}{}", "0".repeat(zeros), ".".repeat(dots)));
        }
    }
    Some(format!("{}%{}", duration.denom(), duration.numer()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n, d)
    }

    #[test]
    fn test_plain_codes() {
        assert_eq!(parse_rhythm_code("4").unwrap(), r(1, 4));
        assert_eq!(parse_rhythm_code("1").unwrap(), r(1, 1));
        assert_eq!(parse_rhythm_code("16").unwrap(), r(1, 16));
        assert_eq!(parse_rhythm_code("12").unwrap(), r(1, 12));
        assert_eq!(parse_rhythm_code("0").unwrap(), r(2, 1));
        assert_eq!(parse_rhythm_code("00").unwrap(), r(4, 1));
    }

    #[test]
    fn test_dotted_codes() {
        assert_eq!(parse_rhythm_code("4.").unwrap(), r(3, 8));
        assert_eq!(parse_rhythm_code("4..").unwrap(), r(7, 16));
        assert_eq!(parse_rhythm_code("2.").unwrap(), r(3, 4));
    }

    #[test]
    fn test_percent_codes() {
        assert_eq!(parse_rhythm_code("2%3").unwrap(), r(3, 2));
        assert_eq!(parse_rhythm_code("3%2").unwrap(), r(2, 3));
        assert_eq!(parse_rhythm_code("2%3.").unwrap(), r(9, 4));
    }

    #[test]
    fn test_malformed_codes() {
        assert!(parse_rhythm_code("").is_err());
        assert!(parse_rhythm_code("abc").is_err());
        assert!(parse_rhythm_code("%4").is_err());
        assert!(parse_rhythm_code("4%").is_err());
    }

    #[test]
    fn test_overlong_codes_are_errors_not_panics() {
        // dot and zero runs long enough to overflow a shifted i64 must
        // come back as errors, like any other malformed code
        let dotted = format!("4{}", ".".repeat(64));
        assert!(parse_rhythm_code(&dotted).is_err());
        assert!(parse_rhythm_code(&"0".repeat(64)).is_err());
        assert!(parse_rhythm_code("0000").is_err());
        assert!(parse_rhythm_code("000").is_ok());
        assert!(parse_rhythm_code("4....").is_ok());
    }

    #[test]
    fn test_triplet_sum_is_exact() {
        let eighth_triplet = parse_rhythm_code("12").unwrap();
        let sum = eighth_triplet + eighth_triplet + eighth_triplet;
        assert_eq!(sum, parse_rhythm_code("4").unwrap());
    }

    #[test]
    fn test_repeated_addition_no_drift() {
        let mut total = Rational::zero();
        for _ in 0..700 {
            total += parse_rhythm_code("28").unwrap(); // septuplet sixteenth
        }
        assert_eq!(total, r(25, 1));
    }

    #[test]
    fn test_rhythm_code_round_trip() {
        for code in ["4", "2", "1", "8", "12", "4.", "2.", "8..", "0", "00", "3%2"] {
            let dur = parse_rhythm_code(code).unwrap();
            assert_eq!(rhythm_code(dur).as_deref(), Some(code), "code {}", code);
        }
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(rational(1, 0), Err(ModelError::Arithmetic));
        assert_eq!(checked_div(r(1, 4), Rational::zero()), Err(ModelError::Arithmetic));
        assert_eq!(checked_div(r(1, 4), r(1, 2)), Ok(r(1, 2)));
    }
}
