//! Static schedule tables: trips and stop times.
//!
//! Rows map positionally onto the column layout of the agency's
//! `trips.txt` and `stop_times.txt`. Loading is all-or-nothing: the first bad
//! row fails the whole table, since silently dropping rows would hide a
//! corrupt schedule.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::{FormatError, TimeOfDay};

const TRIP_FIELDS: usize = 10;
const STOP_TIME_FIELDS: usize = 9;

/// Errors raised while loading schedule tables.
///
/// Row numbers count data rows from 1, not including any header.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{table} row {row}: {source}")]
    Csv {
        table: &'static str,
        row: u64,
        #[source]
        source: csv::Error,
    },

    #[error("{table} row {row}: expected {expected} fields, found {found}")]
    MissingFields {
        table: &'static str,
        row: u64,
        expected: usize,
        found: usize,
    },

    #[error("{table} row {row}, column {column}: {source}")]
    Time {
        table: &'static str,
        row: u64,
        column: &'static str,
        #[source]
        source: FormatError,
    },

    #[error("schedule load task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One scheduled vehicle run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub headsign: String,
    pub direction_id: String,
    pub block_id: String,
    pub shape_id: String,
    pub load_information: String,
    pub wheelchair_accessible: String,
    pub bikes_allowed: String,
}

/// One scheduled visit of a trip to a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: String,
    pub arrival_time: TimeOfDay,
    /// Absent when the source leaves the column blank.
    pub departure_time: Option<TimeOfDay>,
    pub stop_id: String,
    pub stop_sequence: String,
    pub stop_headsign: String,
    pub pickup_type: String,
    pub drop_off_type: String,
    pub shape_dist_traveled: String,
}

/// Where the schedule tables live and how to read them.
#[derive(Debug, Clone)]
pub struct ScheduleFiles {
    pub dir: PathBuf,
    pub trips: String,
    pub stop_times: String,
    /// Skip the first row of each table.
    pub has_headers: bool,
}

impl ScheduleFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            trips: "trips.txt".to_string(),
            stop_times: "stop_times.txt".to_string(),
            has_headers: true,
        }
    }

    pub fn trips_path(&self) -> PathBuf {
        self.dir.join(&self.trips)
    }

    pub fn stop_times_path(&self) -> PathBuf {
        self.dir.join(&self.stop_times)
    }

    /// The most recent modification time across both tables, if both can be stat'ed.
    pub fn modified(&self) -> Option<SystemTime> {
        let trips = std::fs::metadata(self.trips_path()).ok()?.modified().ok()?;
        let stop_times = std::fs::metadata(self.stop_times_path())
            .ok()?
            .modified()
            .ok()?;
        Some(trips.max(stop_times))
    }
}

impl Default for ScheduleFiles {
    fn default() -> Self {
        Self::new("gtfs")
    }
}

/// An immutable, fully parsed copy of the schedule tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub trips: Vec<Trip>,
    pub stop_times: Vec<StopTime>,
}

impl Schedule {
    /// Reads and parses both tables named by `files`.
    #[tracing::instrument(skip_all, fields(dir = %files.dir.display()))]
    pub fn load(files: &ScheduleFiles) -> Result<Self, ScheduleError> {
        let trips = parse_trips(open(&files.trips_path())?, files.has_headers)?;
        let stop_times = parse_stop_times(open(&files.stop_times_path())?, files.has_headers)?;

        info!(
            trips = trips.len(),
            stop_times = stop_times.len(),
            "Schedule loaded"
        );

        Ok(Self { trips, stop_times })
    }
}

fn open(path: &Path) -> Result<File, ScheduleError> {
    debug!(path = %path.display(), "Opening schedule table");
    File::open(path).map_err(|source| ScheduleError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses trip rows from `reader`.
pub fn parse_trips<R: Read>(reader: R, has_headers: bool) -> Result<Vec<Trip>, ScheduleError> {
    read_rows(reader, has_headers, "trips", TRIP_FIELDS, |record, _| {
        Ok(Trip {
            route_id: record[0].to_string(),
            service_id: record[1].to_string(),
            trip_id: record[2].to_string(),
            headsign: record[3].to_string(),
            direction_id: record[4].to_string(),
            block_id: record[5].to_string(),
            shape_id: record[6].to_string(),
            load_information: record[7].to_string(),
            wheelchair_accessible: record[8].to_string(),
            bikes_allowed: record[9].to_string(),
        })
    })
}

/// Parses stop-time rows from `reader`, validating arrival and departure times.
pub fn parse_stop_times<R: Read>(
    reader: R,
    has_headers: bool,
) -> Result<Vec<StopTime>, ScheduleError> {
    read_rows(
        reader,
        has_headers,
        "stop_times",
        STOP_TIME_FIELDS,
        |record, row| {
            let time = |column: &'static str, text: &str| {
                text.parse::<TimeOfDay>()
                    .map_err(|source| ScheduleError::Time {
                        table: "stop_times",
                        row,
                        column,
                        source,
                    })
            };

            let departure_time = match &record[2] {
                "" => None,
                text => Some(time("departure_time", text)?),
            };

            Ok(StopTime {
                trip_id: record[0].to_string(),
                arrival_time: time("arrival_time", &record[1])?,
                departure_time,
                stop_id: record[3].to_string(),
                stop_sequence: record[4].to_string(),
                stop_headsign: record[5].to_string(),
                pickup_type: record[6].to_string(),
                drop_off_type: record[7].to_string(),
                shape_dist_traveled: record[8].to_string(),
            })
        },
    )
}

fn read_rows<R, T, F>(
    reader: R,
    has_headers: bool,
    table: &'static str,
    expected: usize,
    parse: F,
) -> Result<Vec<T>, ScheduleError>
where
    R: Read,
    F: Fn(&StringRecord, u64) -> Result<T, ScheduleError>,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    let mut row = 0u64;

    loop {
        row += 1;
        let more = rdr
            .read_record(&mut record)
            .map_err(|source| ScheduleError::Csv { table, row, source })?;
        if !more {
            break;
        }

        if record.len() < expected {
            return Err(ScheduleError::MissingFields {
                table,
                row,
                expected,
                found: record.len(),
            });
        }

        rows.push(parse(&record, row)?);
    }

    debug!(table, rows = rows.len(), "Parsed schedule table");
    Ok(rows)
}
