use arrival_board::cache::ScheduleCache;
use arrival_board::config::{BoardConfig, RouteQuery};
use arrival_board::display::display_rows;
use arrival_board::schedule::{Schedule, ScheduleError, ScheduleFiles};
use chrono::{DateTime, FixedOffset, TimeZone};

const TRIPS: &str = "\
route_id,service_id,trip_id,trip_headsign,direction_id,block_id,shape_id,trip_load_information,wheelchair_accessible,bikes_allowed\r
4,WKDY,T1,Berryessa,0,,4_shp,,1,1\r
4,WKDY,T2,Berryessa,0,,4_shp,,1,1\r
7,WKDY,T3,Millbrae,0,,7_shp,,1,1\r
7,SAT,T4,Millbrae,0,,7_shp,,1,1\r
";

const STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence,stop_headsign,pickup_type,drop_off_type,shape_dist_traveled\r
T1,09:00:00,09:00:00,NBRK,5,,0,0,4.1\r
T1,09:03:00,09:03:00,DBRK,6,,0,0,5.0\r
T2,09:10:00,09:10:00,NBRK,5,,0,0,4.1\r
T3,09:02:00,09:02:00,NBRK,5,,0,0,4.1\r
T4,09:01:00,09:01:00,NBRK,5,,0,0,4.1\r
T3,24:02:00,24:02:00,DBRK,6,,0,0,5.0\r
";

fn now(h: u32, m: u32) -> DateTime<FixedOffset> {
    FixedOffset::west_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 15, h, m, 0)
        .unwrap()
}

fn write_schedule(dir: &std::path::Path) -> ScheduleFiles {
    std::fs::write(dir.join("trips.txt"), TRIPS).unwrap();
    std::fs::write(dir.join("stop_times.txt"), STOP_TIMES).unwrap();
    ScheduleFiles::new(dir)
}

fn board() -> BoardConfig {
    BoardConfig {
        routes: vec![
            RouteQuery::new("4", "BERRYESSA", "6-CAR, 2-DOOR"),
            RouteQuery::new("7", "MILLBRAE", "6-CAR, 2-DOOR").with_service("WKDY"),
        ],
        stops: vec!["NBRK".to_string(), "DBRK".to_string()],
        arrivals: 2,
    }
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = Schedule::load(&write_schedule(dir.path())).unwrap();

    let rows = display_rows(&schedule, &board(), &now(8, 55)).unwrap();

    assert_eq!(
        rows,
        vec![
            "BERRYESSA  5,15 MIN",
            "6-CAR, 2-DOOR",
            "BERRYESSA  8 MIN",
            "6-CAR, 2-DOOR",
            "MILLBRAE  7 MIN",
            "6-CAR, 2-DOOR",
            "MILLBRAE  907 MIN",
            "6-CAR, 2-DOOR",
        ]
    );
}

#[test]
fn test_late_evening_only_shows_past_midnight_service() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = Schedule::load(&write_schedule(dir.path())).unwrap();

    let rows = display_rows(&schedule, &board(), &now(23, 50)).unwrap();

    assert_eq!(rows, vec!["MILLBRAE  12 MIN", "6-CAR, 2-DOOR"]);
}

#[test]
fn test_corrupt_stop_time_fails_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_schedule(dir.path());
    std::fs::write(
        dir.path().join("stop_times.txt"),
        format!("{STOP_TIMES}T2,9:5:0,,NBRK,7,,0,0,0\r\n"),
    )
    .unwrap();

    let err = Schedule::load(&files).unwrap_err();
    assert!(matches!(err, ScheduleError::Time { row: 7, .. }));
}

#[tokio::test]
async fn test_cached_snapshot_feeds_display() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ScheduleCache::new(write_schedule(dir.path()));

    let schedule = cache.snapshot().await.unwrap();
    let rows = display_rows(&schedule, &board(), &now(9, 5)).unwrap();

    assert_eq!(rows[0], "BERRYESSA  5 MIN");
}
