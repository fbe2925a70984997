//! Schedule times of day and their resolution to instants.
//!
//! Stop times carry wall-clock values such as `08:55:00`. Service that runs
//! past midnight keeps counting hours, so `24:05:00` is five past midnight on
//! the following calendar day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use thiserror::Error;

/// A time-of-day string that could not be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("time of day {text:?} is not in HH:MM:SS form")]
    Layout { text: String },

    #[error("time of day {text:?} has {component} out of range")]
    OutOfRange {
        text: String,
        component: &'static str,
    },

    #[error("{time} does not exist on {date} in this time zone")]
    Nonexistent { date: NaiveDate, time: TimeOfDay },
}

/// A validated `HH:MM:SS` schedule time. The hour may be a single digit.
///
/// Hours are kept as written; anything from 24 upwards belongs to the next
/// calendar day (or later) relative to the service date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hours: u32,
    minutes: u32,
    seconds: u32,
}

impl TimeOfDay {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Option<Self> {
        (hours < 100 && minutes < 60 && seconds < 60).then_some(Self {
            hours,
            minutes,
            seconds,
        })
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Whole days past the service date this time falls on.
    pub fn day_offset(&self) -> u32 {
        self.hours / 24
    }

    /// The clock face reading, with past-midnight hours folded back into 0..24.
    pub fn wall_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hours % 24, self.minutes, self.seconds)
            .unwrap_or(NaiveTime::MIN)
    }

    /// The local date and time this schedule time denotes on `date`'s service day.
    pub fn on_date(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.wall_time()) + TimeDelta::days(i64::from(self.day_offset()))
    }
}

impl FromStr for TimeOfDay {
    type Err = FormatError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let layout = || FormatError::Layout {
            text: text.to_string(),
        };

        let mut parts = text.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(layout());
        };

        let hours = hour_digits(hours.as_bytes()).ok_or_else(layout)?;
        let minutes = two_digits(minutes.as_bytes()).ok_or_else(layout)?;
        let seconds = two_digits(seconds.as_bytes()).ok_or_else(layout)?;

        let out_of_range = |component| FormatError::OutOfRange {
            text: text.to_string(),
            component,
        };
        if minutes >= 60 {
            return Err(out_of_range("minutes"));
        }
        if seconds >= 60 {
            return Err(out_of_range("seconds"));
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// One or two digits; `9:05:00` and `09:05:00` are the same time.
fn hour_digits(digits: &[u8]) -> Option<u32> {
    match digits {
        [ones @ b'0'..=b'9'] => Some(u32::from(ones - b'0')),
        pair => two_digits(pair),
    }
}

fn two_digits(pair: &[u8]) -> Option<u32> {
    match pair {
        [tens @ b'0'..=b'9', ones @ b'0'..=b'9'] => {
            Some(u32::from(tens - b'0') * 10 + u32::from(ones - b'0'))
        }
        _ => None,
    }
}

/// Resolves schedule times against one service date in a time zone.
#[derive(Debug, Clone)]
pub struct ArrivalClock<Tz: TimeZone = Local> {
    date: NaiveDate,
    tz: Tz,
}

impl<Tz: TimeZone> ArrivalClock<Tz> {
    pub fn new(date: NaiveDate, tz: Tz) -> Self {
        Self { date, tz }
    }

    /// A clock whose service date is the calendar date of `now` in its own zone.
    pub fn for_instant(now: &DateTime<Tz>) -> Self {
        Self::new(now.date_naive(), now.timezone())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The instant `time` denotes on this clock's service date.
    ///
    /// Ambiguous local times (clocks going back) take the earlier instant;
    /// times skipped by a forward shift are read one hour later.
    pub fn instant(&self, time: &TimeOfDay) -> Result<DateTime<Tz>, FormatError> {
        let local = time.on_date(self.date);
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(instant) => Ok(instant),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest),
            LocalResult::None => self
                .tz
                .from_local_datetime(&(local + TimeDelta::hours(1)))
                .earliest()
                .ok_or(FormatError::Nonexistent {
                    date: self.date,
                    time: *time,
                }),
        }
    }
}

/// Parses `text` as `HH:MM:SS` and resolves it on `date` in `tz`.
pub fn parse_time_of_day<Tz: TimeZone>(
    text: &str,
    date: NaiveDate,
    tz: &Tz,
) -> Result<DateTime<Tz>, FormatError> {
    let time: TimeOfDay = text.parse()?;
    ArrivalClock::new(date, tz.clone()).instant(&time)
}
