//! Picking the next arrivals at a stop.

use chrono::{DateTime, TimeZone};

use crate::clock::{ArrivalClock, FormatError};
use crate::schedule::StopTime;

/// A stop time together with the instant it arrives on the clock's service day.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival<'a, Tz: TimeZone> {
    pub stop_time: &'a StopTime,
    pub at: DateTime<Tz>,
}

impl<Tz: TimeZone> ArrivalClock<Tz> {
    /// The stop time arriving soonest strictly after `after`.
    ///
    /// When several share the earliest instant the first in input order wins.
    pub fn next_arrival<'a>(
        &self,
        after: &DateTime<Tz>,
        stop_times: &[&'a StopTime],
    ) -> Result<Option<Arrival<'a, Tz>>, FormatError> {
        let mut best: Option<Arrival<'a, Tz>> = None;

        for &stop_time in stop_times {
            let at = self.instant(&stop_time.arrival_time)?;
            if at <= *after {
                continue;
            }
            if best.as_ref().is_none_or(|current| at < current.at) {
                best = Some(Arrival { stop_time, at });
            }
        }

        Ok(best)
    }

    /// Up to `count` arrivals after `start`, in strictly increasing order.
    ///
    /// Each step searches strictly after the previous result's instant, so
    /// records that share an instant with one already returned are passed over.
    pub fn upcoming_arrivals<'a>(
        &self,
        start: &DateTime<Tz>,
        stop_times: &[&'a StopTime],
        count: usize,
    ) -> Result<Vec<Arrival<'a, Tz>>, FormatError> {
        let mut arrivals: Vec<Arrival<'a, Tz>> = Vec::with_capacity(count.min(stop_times.len()));
        let mut cursor = start.clone();

        while arrivals.len() < count {
            let Some(next) = self.next_arrival(&cursor, stop_times)? else {
                break;
            };
            cursor = next.at.clone();
            arrivals.push(next);
        }

        Ok(arrivals)
    }
}
