//! Instrument symbols and price scaling.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Symbols quoted with three implied decimals instead of five.
const THREE_DIGIT_SYMBOLS: [&str; 3] = ["USDRUB", "XAGUSD", "XAUUSD"];

/// Point divisor for the three-digit symbols.
const THREE_DIGIT_DIVISOR: u32 = 1_000;

/// Point divisor for every other symbol.
const DEFAULT_DIVISOR: u32 = 100_000;

/// Errors for invalid symbol codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// The symbol code is empty or whitespace.
    #[error("Symbol must not be empty")]
    Empty,

    /// The symbol code contains characters other than ASCII letters and digits.
    #[error("Invalid symbol '{0}': only ASCII letters and digits are allowed")]
    InvalidCharacters(String),
}

/// An instrument code such as `EURUSD`, normalized to uppercase.
///
/// Cloning is cheap: the code is shared between every tick decoded for it.
/// Deserialization goes through [`Symbol::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Creates a symbol, trimming whitespace and uppercasing the code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is empty or not alphanumeric.
    pub fn new(code: &str) -> Result<Self, SymbolError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SymbolError::Empty);
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SymbolError::InvalidCharacters(code.to_string()));
        }
        Ok(Self(Arc::from(code.to_ascii_uppercase())))
    }

    /// Returns the symbol code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the divisor that turns raw integer prices into decimal prices.
    #[must_use]
    pub fn point_divisor(&self) -> u32 {
        if THREE_DIGIT_SYMBOLS.contains(&self.as_str()) {
            THREE_DIGIT_DIVISOR
        } else {
            DEFAULT_DIVISOR
        }
    }

    /// Returns the point divisor as f64 for price calculations.
    #[must_use]
    pub fn point_divisor_f64(&self) -> f64 {
        f64::from(self.point_divisor())
    }

    /// Returns the number of decimals a price is quoted with.
    #[must_use]
    pub fn digits(&self) -> u32 {
        self.point_divisor().ilog10()
    }

    /// Returns the smallest price increment.
    #[must_use]
    pub fn point(&self) -> f64 {
        1.0 / self.point_divisor_f64()
    }

    /// Returns the base currency (the first three characters).
    #[must_use]
    pub fn base_currency(&self) -> &str {
        let split = self.currency_split();
        &self.0[..split]
    }

    /// Returns the margin/quote currency (everything after the base currency).
    #[must_use]
    pub fn quote_currency(&self) -> &str {
        let split = self.currency_split();
        &self.0[split..]
    }

    fn currency_split(&self) -> usize {
        self.0.len().min(3)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::new(&code)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
