//! Parsing of the textual field types of a feed
use crate::Error;
use chrono::NaiveDate;
use rgb::RGB8;
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// A time of the service day, in seconds since noon minus 12h
///
/// Hours can go beyond 24 for trips running after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LogicalTime(pub u32);

impl LogicalTime {
    /// Builds a time from its components
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(hours * 3600 + minutes * 60 + seconds)
    }

    /// Seconds since the start of the service day
    pub fn seconds(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            self.0 % 3600 / 60,
            self.0 % 60
        )
    }
}

impl Serialize for LogicalTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

fn parse_time_impl(h: &str, m: &str, s: &str) -> Result<u32, std::num::ParseIntError> {
    let hours: u32 = h.parse()?;
    let minutes: u32 = m.parse()?;
    let seconds: u32 = s.parse()?;
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Parses a `H:MM:SS` or `HH:MM:SS` time
pub fn parse_time(s: &str) -> Result<LogicalTime, Error> {
    let len = s.len();
    let invalid = || Error::InvalidTime(s.to_owned());
    if !(7..=9).contains(&len) || !s.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return Err(invalid());
    }
    if &s[len - 3..len - 2] != ":" || &s[len - 6..len - 5] != ":" {
        return Err(invalid());
    }
    let sec = &s[len - 2..];
    let min = &s[len - 5..len - 3];
    let hour = &s[..len - 6];
    let seconds = parse_time_impl(hour, min, sec).map_err(|_| invalid())?;
    if min > "59" || sec > "59" {
        return Err(invalid());
    }
    Ok(LogicalTime(seconds))
}

/// Parses a `YYYYMMDD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, Error> {
    if s.len() != 8 {
        return Err(Error::InvalidDate(s.to_owned()));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| Error::InvalidDate(s.to_owned()))
}

/// Formats a date the way it is written in a feed
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parses a `RRGGBB` color, without a leading `#`
pub fn parse_color(s: &str) -> Result<RGB8, Error> {
    if s.len() != 6 || !s.is_ascii() {
        return Err(Error::InvalidColor(s.to_owned()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| Error::InvalidColor(s.to_owned()))
    };
    Ok(RGB8::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Color used for a route without `route_color`
pub fn default_route_color() -> RGB8 {
    RGB8::new(255, 255, 255)
}

/// Parses the `0`/`1` booleans of the calendar
pub fn parse_bool(s: &str) -> Result<bool, Error> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(Error::InvalidBool(s.to_owned())),
    }
}
