//! Narrowing the schedule down to one route at one stop.
//!
//! The filters compose in a fixed order: route, then that route's trips'
//! stop times, then the stop. Each is total; stop times that reference no
//! matching trip simply never come through.

use std::collections::HashMap;

use crate::schedule::{StopTime, Trip};

/// Trips on `route_id`, further restricted to `service_id` when one is given.
pub fn trips_for_route<'a>(
    route_id: &str,
    service_id: Option<&str>,
    trips: &'a [Trip],
) -> Vec<&'a Trip> {
    trips
        .iter()
        .filter(|trip| trip.route_id == route_id)
        .filter(|trip| service_id.is_none_or(|service| trip.service_id == service))
        .collect()
}

/// Stop times belonging to `trips`, grouped in trip order and then in their
/// input order within each trip. Duplicate trips yield duplicate stop times.
pub fn stop_times_for_trips<'a>(trips: &[&Trip], stop_times: &'a [StopTime]) -> Vec<&'a StopTime> {
    let mut by_trip: HashMap<&str, Vec<&'a StopTime>> = HashMap::new();
    for stop_time in stop_times {
        by_trip
            .entry(stop_time.trip_id.as_str())
            .or_default()
            .push(stop_time);
    }

    trips
        .iter()
        .filter_map(|trip| by_trip.get(trip.trip_id.as_str()))
        .flatten()
        .copied()
        .collect()
}

/// Stop times at `stop_id`, order preserved.
pub fn stop_times_for_stop<'a>(stop_id: &str, stop_times: &[&'a StopTime]) -> Vec<&'a StopTime> {
    stop_times
        .iter()
        .copied()
        .filter(|stop_time| stop_time.stop_id == stop_id)
        .collect()
}
