//! Dukascopy URL construction.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Base URL for Dukascopy data feed.
pub const BASE_URL: &str = "https://datafeed.dukascopy.com/datafeed";

/// Builds the URL for a specific hour's tick data.
///
/// URL format: `{base}/{SYMBOL}/{YEAR}/{MONTH}/{DAY}/{HOUR}h_ticks.bi5`
///
/// Note: Dukascopy uses 0-indexed months (January = 00).
///
/// # Example
///
/// ```
/// use chronobar_fetch::url::{BASE_URL, tick_url};
/// use chrono::{TimeZone, Utc};
///
/// let hour = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
/// let url = tick_url(BASE_URL, "EURUSD", hour);
/// assert_eq!(url, "https://datafeed.dukascopy.com/datafeed/EURUSD/2024/00/15/12h_ticks.bi5");
/// ```
#[must_use]
pub fn tick_url(base: &str, symbol: &str, hour: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}/{:02}/{:02}/{:02}h_ticks.bi5",
        base.trim_end_matches('/'),
        symbol.to_uppercase(),
        hour.year(),
        hour.month0(),
        hour.day(),
        hour.hour()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tick_url_january() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            tick_url(BASE_URL, "eurusd", hour),
            "https://datafeed.dukascopy.com/datafeed/EURUSD/2024/00/15/12h_ticks.bi5"
        );
    }

    #[test]
    fn test_tick_url_december() {
        let hour = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            tick_url(BASE_URL, "XAUUSD", hour),
            "https://datafeed.dukascopy.com/datafeed/XAUUSD/2024/11/31/23h_ticks.bi5"
        );
    }

    #[test]
    fn test_tick_url_custom_base() {
        let hour = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let url = tick_url("http://localhost:8080/feed/", "GBPJPY", hour);
        assert_eq!(url, "http://localhost:8080/feed/GBPJPY/2024/05/01/00h_ticks.bi5");
    }
}
