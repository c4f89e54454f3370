use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub const fn at(hour: u8) -> Self {
        Self { hour, minute: 0 }
    }

    fn from_minutes(minutes: u16) -> Self {
        Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        }
    }

    pub fn minutes(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    /// Form input: `9`, `9:30` and `09:30` are accepted, a missing or
    /// unreadable minute part counts as `:00`. Returns `None` when there is no
    /// leading hour or the value is not a time of day.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let text = text.trim();
        let (hour, minute) = match text.split_once(':') {
            Some((h, m)) => (h, Some(m)),
            None => (text, None),
        };

        let hour: u8 = hour.trim().parse().ok()?;
        let minute: u8 = minute.and_then(|m| m.trim().parse().ok()).unwrap_or(0);
        Self::new(hour, minute)
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_owned());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse().map_err(|_| invalid())?;
        let minute = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Half-open range of minutes since midnight, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u16,
    pub end: u16,
}

impl Span {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn between(start: ClockTime, end: ClockTime) -> Self {
        Self::new(start.minutes(), end.minutes())
    }

    /// Touching ranges do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            ClockTime::from_minutes(self.start),
            ClockTime::from_minutes(self.end)
        )
    }
}

/// Records that occupy a span within some partition (a day and a slot kind,
/// a room, ...). Only records in the same partition can conflict.
pub trait Interval {
    type Partition: PartialEq;

    fn partition(&self) -> Self::Partition;

    fn span(&self) -> Span;
}

pub fn find_conflict<'a, R: Interval>(existing: &'a [R], candidate: &R) -> Option<&'a R> {
    let partition = candidate.partition();
    let span = candidate.span();

    existing
        .iter()
        .find(|r| r.partition() == partition && r.span().overlaps(&span))
}

/// The hours a kind of session may be booked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub open: ClockTime,
    pub close: ClockTime,
}

pub const LECTURE_HOURS: Window = Window {
    open: ClockTime::at(8),
    close: ClockTime::at(12),
};

pub const LAB_HOURS: Window = Window {
    open: ClockTime::at(14),
    close: ClockTime::at(18),
};

impl Window {
    /// Turns raw start/end input into a slot inside the window.
    ///
    /// A missing start is the opening time and a missing end is an hour after
    /// the start, as is an end that does not come after the start. A start
    /// outside the window moves to the nearest hour-long slot inside it and the
    /// end is capped at closing time. The result is never empty.
    pub fn slot(&self, start: &str, end: &str) -> (ClockTime, ClockTime) {
        let open = self.open.minutes();
        let close = self.close.minutes();

        let start = ClockTime::parse_lenient(start)
            .map(|t| t.minutes())
            .unwrap_or(open);
        let mut end = ClockTime::parse_lenient(end)
            .map(|t| t.minutes())
            .unwrap_or(start + 60);
        if end <= start {
            end = start + 60;
        }

        let start = if start < open {
            open
        } else if start >= close {
            close - 60
        } else {
            start
        };
        let end = end.min(close);
        let end = if end <= start { (start + 60).min(close) } else { end };

        (ClockTime::from_minutes(start), ClockTime::from_minutes(end))
    }
}

/// Accepts exactly `YYYY-MM-DD`, a real calendar day in 1900..=2100.
pub fn validate_date(text: &str) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::InvalidDate(text.to_owned());
    let bytes = text.as_bytes();

    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(invalid());
    }

    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?;
    if !(1900..=2100).contains(&date.year()) {
        return Err(invalid());
    }

    Ok(date)
}

pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Timestamp in the `Thu Mar  4 10:15:00 2025` style used for announcements.
pub fn timestamp() -> String {
    Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(text: &str) -> ClockTime {
        text.parse().unwrap()
    }

    #[test]
    fn lenient_parse_accepts_hour_only() {
        assert_eq!(ClockTime::parse_lenient("9"), Some(t("09:00")));
        assert_eq!(ClockTime::parse_lenient(" 9:30 "), Some(t("09:30")));
        assert_eq!(ClockTime::parse_lenient("9:xx"), Some(t("09:00")));
        assert_eq!(ClockTime::parse_lenient("noon"), None);
        assert_eq!(ClockTime::parse_lenient("25:00"), None);
    }

    #[test]
    fn strict_parse_needs_both_parts() {
        assert!("8".parse::<ClockTime>().is_err());
        assert!("08:60".parse::<ClockTime>().is_err());
        assert_eq!("8:05".parse::<ClockTime>().unwrap().to_string(), "08:05");
    }

    #[test]
    fn half_open_overlap() {
        let base = Span::between(t("08:00"), t("09:00"));

        assert!(base.overlaps(&Span::between(t("08:30"), t("09:30"))));
        assert!(base.overlaps(&Span::between(t("07:00"), t("10:00"))));
        assert!(!base.overlaps(&Span::between(t("09:00"), t("10:00"))));
        assert!(!base.overlaps(&Span::between(t("07:00"), t("08:00"))));
    }

    #[test]
    fn lecture_slots_default_and_clamp() {
        assert_eq!(LECTURE_HOURS.slot("", ""), (t("08:00"), t("09:00")));
        assert_eq!(LECTURE_HOURS.slot("10:00", ""), (t("10:00"), t("11:00")));
        assert_eq!(LECTURE_HOURS.slot("10:00", "09:00"), (t("10:00"), t("11:00")));
        assert_eq!(LECTURE_HOURS.slot("06:00", "07:00"), (t("08:00"), t("09:00")));
        assert_eq!(LECTURE_HOURS.slot("11:30", "13:00"), (t("11:30"), t("12:00")));
        assert_eq!(LECTURE_HOURS.slot("12:00", ""), (t("11:00"), t("12:00")));
    }

    #[test]
    fn lab_slots_live_in_the_afternoon() {
        assert_eq!(LAB_HOURS.slot("", ""), (t("14:00"), t("15:00")));
        assert_eq!(LAB_HOURS.slot("9", "11"), (t("14:00"), t("15:00")));
        assert_eq!(LAB_HOURS.slot("16:00", "19:30"), (t("16:00"), t("18:00")));
    }

    #[test]
    fn dates_must_be_real_days() {
        assert!(validate_date("2024-02-29").is_ok());
        assert!(validate_date("2023-02-29").is_err());
        assert!(validate_date("2024-13-01").is_err());
        assert!(validate_date("2024-1-01").is_err());
        assert!(validate_date("1899-12-31").is_err());
        assert!(validate_date("2024/01/01").is_err());
    }

    #[test]
    fn span_displays_as_clock_range() {
        assert_eq!(Span::new(480, 570).to_string(), "08:00-09:30");
    }
}
