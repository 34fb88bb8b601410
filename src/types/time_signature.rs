use crate::errors::ModelError;
use crate::types::rational::Rational;
use std::fmt;
use std::str::FromStr;

/// A meter taken from a `*M<num>/<den>` tandem interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: i64,
    pub denominator: i64,
}

impl TimeSignature {
    pub fn new(numerator: i64, denominator: i64) -> Result<Self, ModelError> {
        if denominator == 0 {
            return Err(ModelError::Arithmetic);
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Exact duration of one full measure, in timebase units.
    /// In 4/4 with the default timebase of 4 this is exactly 4.
    pub fn capacity(&self, timebase: i64) -> Rational {
        // denominator is non-zero by construction
        Rational::from_integer(self.numerator) * Rational::new(timebase, self.denominator)
    }

    /// Parse the tandem token form, e.g. `*M3/4`. Returns `None` for other
    /// tandems (including `*MM` tempo markings, which share the prefix).
    pub fn from_tandem(token: &str) -> Option<Self> {
        let rest = token.strip_prefix("*M")?;
        if rest.starts_with('M') {
            return None;
        }
        rest.parse().ok()
    }
}

impl FromStr for TimeSignature {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s.split_once('/').ok_or(ModelError::Arithmetic)?;
        let numerator: i64 = num.parse().map_err(|_| ModelError::Arithmetic)?;
        let denominator: i64 = den.parse().map_err(|_| ModelError::Arithmetic)?;
        Self::new(numerator, denominator)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
