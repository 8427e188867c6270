//! Bar timeframe definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unit of a timeframe specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodUnit {
    /// Minutes (`M`).
    Minute,
    /// Hours (`H`).
    Hour,
    /// Days (`D`).
    Day,
    /// Weeks (`W`).
    Week,
    /// Months of 30 days (`MN`).
    Month,
}

impl PeriodUnit {
    /// Returns the unit length in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        match self {
            Self::Minute => 1,
            Self::Hour => 60,
            Self::Day => 24 * 60,
            Self::Week => 7 * 24 * 60,
            Self::Month => 30 * 24 * 60,
        }
    }

    /// Returns the unit prefix used in period labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "M",
            Self::Hour => "H",
            Self::Day => "D",
            Self::Week => "W",
            Self::Month => "MN",
        }
    }
}

/// A bar window: a [`PeriodUnit`] times a positive multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    unit: PeriodUnit,
    multiplier: u32,
}

impl Timeframe {
    /// One-minute bars, the fallback for unparsable specifications.
    pub const M1: Self = Self {
        unit: PeriodUnit::Minute,
        multiplier: 1,
    };

    /// Creates a timeframe, returning `None` for a zero multiplier or a
    /// window that overflows `u32` minutes.
    #[must_use]
    pub const fn new(unit: PeriodUnit, multiplier: u32) -> Option<Self> {
        if multiplier == 0 {
            return None;
        }
        match unit.minutes().checked_mul(multiplier) {
            Some(_) => Some(Self { unit, multiplier }),
            None => None,
        }
    }

    /// Parses a specification such as `M5`, falling back to [`Timeframe::M1`].
    #[must_use]
    pub fn parse_or_default(spec: &str) -> Self {
        spec.parse().unwrap_or(Self::M1)
    }

    /// Parses a comma-separated list such as `M1,M5,H1`.
    ///
    /// Unparsable entries become [`Timeframe::M1`]; the returned list is never
    /// empty.
    #[must_use]
    pub fn parse_list(specs: &str) -> Vec<Self> {
        let timeframes: Vec<Self> = specs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse_or_default)
            .collect();

        if timeframes.is_empty() {
            vec![Self::M1]
        } else {
            timeframes
        }
    }

    /// Returns the unit.
    #[must_use]
    pub const fn unit(&self) -> PeriodUnit {
        self.unit
    }

    /// Returns the multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Returns the window length in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        self.unit.minutes() * self.multiplier
    }

    /// Returns the window length in seconds.
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.minutes() as i64 * 60
    }

    /// Returns the start of the window containing `epoch_seconds`.
    ///
    /// Equivalent to `t - t mod window` for non-negative times.
    #[must_use]
    pub const fn align(&self, epoch_seconds: i64) -> i64 {
        epoch_seconds - epoch_seconds.rem_euclid(self.seconds())
    }

    /// Returns the period label, e.g. `M15` or `MN1`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{}", self.unit.as_str(), self.multiplier)
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::M1
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.unit.as_str(), self.multiplier)
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();

        // `MN` must be tried before `M`.
        let (unit, digits) = if let Some(rest) = upper.strip_prefix("MN") {
            (PeriodUnit::Month, rest)
        } else if let Some(rest) = upper.strip_prefix('M') {
            (PeriodUnit::Minute, rest)
        } else if let Some(rest) = upper.strip_prefix('H') {
            (PeriodUnit::Hour, rest)
        } else if let Some(rest) = upper.strip_prefix('D') {
            (PeriodUnit::Day, rest)
        } else if let Some(rest) = upper.strip_prefix('W') {
            (PeriodUnit::Week, rest)
        } else {
            return Err(TimeframeParseError(s.to_string()));
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeframeParseError(s.to_string()));
        }

        digits
            .parse::<u32>()
            .ok()
            .and_then(|multiplier| Self::new(unit, multiplier))
            .ok_or_else(|| TimeframeParseError(s.to_string()))
    }
}

/// Error returned when parsing an invalid timeframe string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeframeParseError(String);

impl std::fmt::Display for TimeframeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid timeframe '{}', expected a unit (M, H, D, W, MN) followed by a positive number",
            self.0
        )
    }
}

impl std::error::Error for TimeframeParseError {}
