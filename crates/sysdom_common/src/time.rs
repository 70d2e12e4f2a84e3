//! Physical simulation time with unit parsing and display.
//!
//! All durations are stored as an integer number of femtoseconds. Parsing
//! accepts `"10ns"`, `"10 ns"`, `"2.5us"` and bare integers (femtoseconds).
//! Negative values are rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A time unit, ordered from finest to coarsest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Femtoseconds.
    Fs,
    /// Picoseconds.
    Ps,
    /// Nanoseconds.
    Ns,
    /// Microseconds.
    Us,
    /// Milliseconds.
    Ms,
    /// Seconds.
    S,
}

impl TimeUnit {
    /// All units, finest first.
    pub const ALL: [TimeUnit; 6] = [
        TimeUnit::Fs,
        TimeUnit::Ps,
        TimeUnit::Ns,
        TimeUnit::Us,
        TimeUnit::Ms,
        TimeUnit::S,
    ];

    /// Femtoseconds in one of this unit.
    pub fn femtos(self) -> u64 {
        match self {
            TimeUnit::Fs => 1,
            TimeUnit::Ps => 1_000,
            TimeUnit::Ns => 1_000_000,
            TimeUnit::Us => 1_000_000_000,
            TimeUnit::Ms => 1_000_000_000_000,
            TimeUnit::S => 1_000_000_000_000_000,
        }
    }

    /// The suffix used when parsing and printing.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        }
    }
}

/// A non-negative duration or absolute instant, in femtoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Time(u64);

impl Time {
    /// Zero time.
    pub const ZERO: Time = Time(0);

    /// `value` units of `unit`, saturating at `u64::MAX` femtoseconds.
    pub fn new(value: u64, unit: TimeUnit) -> Self {
        Self(value.saturating_mul(unit.femtos()))
    }

    /// A time given in femtoseconds.
    pub fn from_fs(fs: u64) -> Self {
        Self(fs)
    }

    /// Nanosecond shorthand.
    pub fn ns(value: u64) -> Self {
        Self::new(value, TimeUnit::Ns)
    }

    /// Picosecond shorthand.
    pub fn ps(value: u64) -> Self {
        Self::new(value, TimeUnit::Ps)
    }

    /// The value in femtoseconds.
    pub fn as_fs(self) -> u64 {
        self.0
    }

    /// True for zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Sum, `None` on overflow.
    pub fn checked_add(self, other: Time) -> Option<Time> {
        self.0.checked_add(other.0).map(Time)
    }

    /// Rounds down to a multiple of `resolution`. A zero resolution leaves the
    /// value unchanged.
    pub fn quantize(self, resolution: Time) -> Time {
        match resolution.0 {
            0 => self,
            r => Time(self.0 - self.0 % r),
        }
    }

    /// The coarsest unit that represents this time exactly.
    pub fn natural_unit(self) -> TimeUnit {
        TimeUnit::ALL
            .iter()
            .rev()
            .copied()
            .find(|u| self.0 % u.femtos() == 0)
            .unwrap_or(TimeUnit::Fs)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({self})")
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "0fs");
        }
        let unit = self.natural_unit();
        write!(f, "{}{}", self.0 / unit.femtos(), unit.suffix())
    }
}

/// Error returned when a time string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: '{input}'")]
pub struct ParseTimeError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Time {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseTimeError {
            input: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();

        // Longest suffixes first so "ms" is not read as "s".
        let mut units = TimeUnit::ALL;
        units.sort_by_key(|u| std::cmp::Reverse(u.suffix().len()));
        let (number, unit) = units
            .iter()
            .find_map(|u| lower.strip_suffix(u.suffix()).map(|n| (n.trim(), *u)))
            .unwrap_or((lower.as_str(), TimeUnit::Fs));

        if number.is_empty() || number.starts_with('-') {
            return Err(err());
        }
        if let Ok(whole) = number.parse::<u64>() {
            return whole
                .checked_mul(unit.femtos())
                .map(Time)
                .ok_or_else(err);
        }
        let value: f64 = number.parse().map_err(|_| err())?;
        if !value.is_finite() || value < 0.0 {
            return Err(err());
        }
        let fs = (value * unit.femtos() as f64).round();
        if fs > u64::MAX as f64 {
            return Err(err());
        }
        Ok(Time(fs as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_suffixed() {
        assert_eq!("10ns".parse::<Time>().unwrap(), Time::ns(10));
        assert_eq!("10 ns".parse::<Time>().unwrap(), Time::ns(10));
        assert_eq!("3MS".parse::<Time>().unwrap(), Time::new(3, TimeUnit::Ms));
        assert_eq!("1s".parse::<Time>().unwrap(), Time::new(1, TimeUnit::S));
        assert_eq!("2.5us".parse::<Time>().unwrap(), Time::ns(2_500));
        assert_eq!("42".parse::<Time>().unwrap(), Time::from_fs(42));
    }

    #[test]
    fn parse_rejects_garbage_and_negatives() {
        assert!("".parse::<Time>().is_err());
        assert!("ns".parse::<Time>().is_err());
        assert!("-5ns".parse::<Time>().is_err());
        assert!("five ns".parse::<Time>().is_err());
        let e = "-1ps".parse::<Time>().unwrap_err();
        assert_eq!(e.to_string(), "invalid time: '-1ps'");
    }

    #[test]
    fn display_uses_coarsest_exact_unit() {
        assert_eq!(Time::ns(10).to_string(), "10ns");
        assert_eq!(Time::ps(1_500).to_string(), "1500ps");
        assert_eq!(Time::new(2, TimeUnit::Us).to_string(), "2us");
        assert_eq!(Time::ZERO.to_string(), "0fs");
    }

    #[test]
    fn quantize_to_resolution() {
        assert_eq!(Time::ps(1_999).quantize(Time::ns(1)), Time::ns(1));
        assert_eq!(Time::ps(7).quantize(Time::ZERO), Time::ps(7));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Time::ns(1).checked_add(Time::ps(5)), Some(Time::ps(1_005)));
        assert_eq!(Time::from_fs(u64::MAX).checked_add(Time::from_fs(1)), None);
        assert!(Time::ZERO.is_zero());
        assert!(Time::ns(1) > Time::ps(999));
    }
}
