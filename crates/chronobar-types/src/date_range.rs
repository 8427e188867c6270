//! Date range, day and hour iteration.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};

use crate::DateRangeError;

/// An inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a date range for a single day.
    #[must_use]
    pub const fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Returns an iterator over all days in the range.
    #[must_use]
    pub const fn days(&self) -> DayIterator {
        DayIterator {
            current: Some(self.start),
            end: self.end,
        }
    }

    /// Returns the total number of days in the range.
    #[must_use]
    pub fn total_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Returns midnight UTC of the given day.
#[must_use]
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Returns true if the archive publishes no ticks for this day.
#[must_use]
pub fn is_saturday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat
}

/// Iterator over the days of a [`DateRange`].
#[derive(Debug, Clone)]
pub struct DayIterator {
    current: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DayIterator {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let day = self.current.filter(|day| *day <= self.end)?;
        self.current = day.succ_opt();
        Some(day)
    }
}

/// Iterator over all hours in a date range.
#[derive(Debug, Clone)]
pub struct HourIterator {
    current: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl HourIterator {
    /// Creates a new hour iterator for the given days (inclusive).
    fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            current: day_start(start),
            // Last hour of the end date.
            end: day_start(end) + TimeDelta::hours(23),
        }
    }

    /// Returns an iterator over the 24 hours of a single day.
    #[must_use]
    pub fn for_day(day: NaiveDate) -> Self {
        Self::new(day, day)
    }
}

impl Iterator for HourIterator {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current > self.end {
            return None;
        }

        let result = self.current;
        self.current += TimeDelta::hours(1);
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.current > self.end {
            return (0, Some(0));
        }
        let hours = (self.end - self.current).num_hours() as usize + 1;
        (hours, Some(hours))
    }
}

impl ExactSizeIterator for HourIterator {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_new() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();

        assert_eq!(range.start, date(2024, 1, 1));
        assert_eq!(range.end, date(2024, 1, 31));
        assert_eq!(range.total_days(), 31);
    }

    #[test]
    fn test_date_range_invalid() {
        assert!(DateRange::new(date(2024, 1, 31), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_day_iterator() {
        let range = DateRange::new(date(2024, 2, 28), date(2024, 3, 1)).unwrap();
        let days: Vec<_> = range.days().collect();

        assert_eq!(days, [date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
    }

    #[test]
    fn test_hour_iterator() {
        let hours = HourIterator::for_day(date(2024, 1, 1));
        assert_eq!(hours.len(), 24);

        let hours: Vec<_> = hours.collect();
        assert_eq!(hours[0].hour(), 0);
        assert_eq!(hours[23].hour(), 23);
    }

    #[test]
    fn test_is_saturday() {
        assert!(is_saturday(date(2024, 1, 6)));
        assert!(!is_saturday(date(2024, 1, 7)));
    }
}
