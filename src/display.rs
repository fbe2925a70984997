//! Rendering arrivals as sign rows.

use chrono::{DateTime, TimeZone};
use tracing::debug;

use crate::clock::{ArrivalClock, FormatError};
use crate::config::BoardConfig;
use crate::filter::{stop_times_for_stop, stop_times_for_trips, trips_for_route};
use crate::resolver::Arrival;
use crate::schedule::Schedule;

/// Minutes from `now` until each arrival, e.g. `"5,15 MIN"`.
///
/// Minutes are rounded half away from zero.
pub fn format_countdowns<Tz: TimeZone>(arrivals: &[Arrival<'_, Tz>], now: &DateTime<Tz>) -> String {
    let minutes: Vec<String> = arrivals
        .iter()
        .map(|arrival| {
            let until = arrival.at.clone().signed_duration_since(now);
            let minutes = until.num_milliseconds() as f64 / 60_000.0;
            format!("{}", minutes.round() as i64)
        })
        .collect();

    format!("{} MIN", minutes.join(","))
}

/// Builds the sign rows for every configured route and stop.
///
/// Each route and stop with at least one upcoming arrival contributes a
/// `"<sign code>  <countdowns>"` row followed by the route's equipment row.
pub fn display_rows<Tz: TimeZone>(
    schedule: &Schedule,
    config: &BoardConfig,
    now: &DateTime<Tz>,
) -> Result<Vec<String>, FormatError> {
    let clock = ArrivalClock::for_instant(now);
    let mut rows = Vec::new();

    for route in &config.routes {
        let trips = trips_for_route(
            &route.route_id,
            route.service_id.as_deref(),
            &schedule.trips,
        );
        let trip_stop_times = stop_times_for_trips(&trips, &schedule.stop_times);

        for stop_id in &config.stops {
            let stop_times = stop_times_for_stop(stop_id, &trip_stop_times);
            let upcoming = clock.upcoming_arrivals(now, &stop_times, config.arrivals)?;

            if upcoming.is_empty() {
                debug!(route = %route.route_id, stop = %stop_id, "No upcoming arrivals");
                continue;
            }

            rows.push(format!(
                "{}  {}",
                route.sign_code,
                format_countdowns(&upcoming, now)
            ));
            rows.push(route.equipment.clone());
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteQuery;
    use crate::schedule::{parse_stop_times, parse_trips};
    use chrono::FixedOffset;

    fn pacific() -> FixedOffset {
        FixedOffset::west_opt(8 * 3600).unwrap()
    }

    fn now(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        pacific().with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn schedule() -> Schedule {
        let trips = parse_trips(
            "4,WKDY,T1,Berryessa,0,,,,,\n7,WKDY,T2,Millbrae,0,,,,,\n7,SAT,T3,Millbrae,0,,,,,\n"
                .as_bytes(),
            false,
        )
        .unwrap();
        let stop_times = parse_stop_times(
            "T1,09:00:00,09:00:00,NBRK,1,,,,\n\
             T1,09:10:00,09:10:00,NBRK,1,,,,\n\
             T2,09:03:00,09:03:00,NBRK,1,,,,\n\
             T3,09:04:00,09:04:00,NBRK,1,,,,\n"
                .as_bytes(),
            false,
        )
        .unwrap();
        Schedule { trips, stop_times }
    }

    fn board() -> BoardConfig {
        BoardConfig {
            routes: vec![RouteQuery::new("4", "BERRYESSA", "6-CAR, 2-DOOR")],
            stops: vec!["NBRK".to_string()],
            arrivals: 2,
        }
    }

    #[test]
    fn test_format_rounds_to_nearest_minute() {
        let schedule = schedule();
        let clock = ArrivalClock::for_instant(&now(8, 55, 0));
        let refs: Vec<_> = schedule.stop_times.iter().take(2).collect();
        let upcoming = clock.upcoming_arrivals(&now(8, 55, 0), &refs, 2).unwrap();

        assert_eq!(format_countdowns(&upcoming, &now(8, 55, 0)), "5,15 MIN");
        assert_eq!(format_countdowns(&upcoming, &now(8, 55, 30)), "5,15 MIN");
        assert_eq!(format_countdowns(&upcoming, &now(8, 55, 29)), "5,15 MIN");
        assert_eq!(format_countdowns(&upcoming, &now(8, 55, 31)), "4,14 MIN");
    }

    #[test]
    fn test_rows_for_two_arrivals() {
        let rows = display_rows(&schedule(), &board(), &now(8, 55, 0)).unwrap();
        assert_eq!(rows, vec!["BERRYESSA  5,15 MIN", "6-CAR, 2-DOOR"]);
    }

    #[test]
    fn test_rows_with_single_remaining_arrival() {
        let rows = display_rows(&schedule(), &board(), &now(9, 5, 0)).unwrap();
        assert_eq!(rows, vec!["BERRYESSA  5 MIN", "6-CAR, 2-DOOR"]);
    }

    #[test]
    fn test_unknown_stop_contributes_nothing() {
        let mut config = board();
        config.stops = vec!["DBRK".to_string()];
        let rows = display_rows(&schedule(), &config, &now(8, 55, 0)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_service_scoping() {
        let mut config = board();
        config.routes = vec![
            RouteQuery::new("7", "MILLBRAE", "6-CAR, 2-DOOR"),
            RouteQuery::new("7", "MILLBRAE SAT", "4-CAR").with_service("SAT"),
        ];
        config.arrivals = 3;

        let rows = display_rows(&schedule(), &config, &now(9, 0, 0)).unwrap();
        assert_eq!(
            rows,
            vec!["MILLBRAE  3,4 MIN", "6-CAR, 2-DOOR", "MILLBRAE SAT  4 MIN", "4-CAR"]
        );
    }

    #[test]
    fn test_rows_follow_route_order() {
        let mut config = board();
        config.routes.push(RouteQuery::new("7", "MILLBRAE", "6-CAR, 2-DOOR"));
        config.arrivals = 1;

        let rows = display_rows(&schedule(), &config, &now(8, 59, 0)).unwrap();
        assert_eq!(
            rows,
            vec!["BERRYESSA  1 MIN", "6-CAR, 2-DOOR", "MILLBRAE  4 MIN", "6-CAR, 2-DOOR"]
        );
    }
}
