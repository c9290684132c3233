use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::Error;

/// A calendar month, the granularity at which the visit and physical-item
/// datasets are reported.
///
/// Internally pinned to the first day of the month so that ordering and
/// equality come straight from [`time::Date`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(time::Date);

impl Month {
    /// Construct a month from a year and a 1-based month number.
    pub fn new(year: i32, month: u8) -> Result<Self, Error> {
        let invalid = || Error::InvalidMonth(format!("{}-{}", year, month));
        let month = time::Month::try_from(month).map_err(|_| invalid())?;
        let date = time::Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;
        Ok(Self(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u8 {
        self.0.month() as u8
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Accepts `YYYY-MM` as well as a full `YYYY-MM-DD` date (the day is
    /// discarded), which is how the monthly datasets encode their period
    /// column.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidMonth(s.to_string());
        let mut parts = s.trim().splitn(3, '-');
        let year = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        let month = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(invalid)?;
        if let Some(day) = parts.next() {
            if day.parse::<u8>().is_err() {
                return Err(invalid());
            }
        }
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.0.year(), self.0.month() as u8)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Month> for time::Date {
    fn from(m: Month) -> Self {
        m.0
    }
}

/// A time of day without a date, used for program start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(time::Time);

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, Error> {
        let t = time::Time::from_hms(hour, minute, 0)
            .map_err(|_| Error::InvalidTime(format!("{}:{}", hour, minute)))?;
        Ok(Self(t))
    }

    /// Minutes since midnight, a convenient scalar axis for scatter output.
    pub fn minutes_since_midnight(&self) -> u16 {
        u16::from(self.0.hour()) * 60 + u16::from(self.0.minute())
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    /// Accepts `HH:MM` or `HH:MM:SS`; seconds are discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidTime(s.to_string());
        let mut parts = s.trim().splitn(3, ':');
        let hour = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(invalid)?;
        let minute = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(invalid)?;
        if let Some(seconds) = parts.next() {
            if seconds.parse::<u8>().is_err() {
                return Err(invalid());
            }
        }
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<ClockTime> for time::Time {
    fn from(t: ClockTime) -> Self {
        t.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn month_parsing() {
        let m = Month::from_str("2023-04").unwrap();
        assert_eq!((m.year(), m.month()), (2023, 4));
        assert_eq!(m.to_string(), "2023-04");

        // Full dates collapse to their month.
        let m = Month::from_str("2023-04-17").unwrap();
        assert_eq!(m.to_string(), "2023-04");

        assert!(Month::from_str("2023-13").is_err());
        assert!(Month::from_str("April 2023").is_err());
    }

    #[test]
    fn month_ordering() {
        let jan = Month::from_str("2024-01").unwrap();
        let dec = Month::from_str("2023-12").unwrap();
        assert!(dec < jan);
    }

    #[test]
    fn clock_time_parsing() {
        let t = ClockTime::from_str("14:30").unwrap();
        assert_eq!(t.minutes_since_midnight(), 14 * 60 + 30);
        assert_eq!(t.to_string(), "14:30");

        let t = ClockTime::from_str("09:05:00").unwrap();
        assert_eq!(t.to_string(), "09:05");

        assert!(ClockTime::from_str("25:00").is_err());
        assert!(ClockTime::from_str("2pm").is_err());
    }
}
