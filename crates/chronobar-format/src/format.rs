//! Output format identifier.

use crate::FormatError;

/// Output format identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Comma-separated ticks.
    #[default]
    Csv,
    /// MetaTrader 4 history bars (version 401).
    Hst,
    /// MetaTrader 4 strategy tester data (version 405).
    Fxt,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Hst => "hst",
            Self::Fxt => "fxt",
        }
    }

    /// Returns all available formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Csv, Self::Hst, Self::Fxt]
    }

    /// Returns true if the format writes one file per timeframe.
    ///
    /// CSV holds ticks, so a single file serves every timeframe.
    #[must_use]
    pub const fn is_per_timeframe(&self) -> bool {
        !matches!(self, Self::Csv)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "hst" => Ok(Self::Hst),
            "fxt" => Ok(Self::Fxt),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}
