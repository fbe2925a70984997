//! CLI entry point for the arrival board.
//!
//! Serves the next-arrival rows over HTTP, prints them once, refreshes the
//! static schedule archive, or inspects the realtime trip-update feed.

use std::ffi::OsStr;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use arrival_board::archive::{DEFAULT_SCHEDULE_URL, fetch_schedule, needs_refresh};
use arrival_board::cache::ScheduleCache;
use arrival_board::config::BoardConfig;
use arrival_board::display::display_rows;
use arrival_board::fetch::BasicClient;
use arrival_board::realtime::{DEFAULT_TRIP_UPDATE_URL, parse_feed, trip_update_ids};
use arrival_board::schedule::{Schedule, ScheduleFiles};
use arrival_board::server::{AppState, serve};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "arrival_board")]
#[command(about = "Next-arrival countdowns from a static transit schedule", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BoardArgs {
    /// Directory holding trips.txt and stop_times.txt
    #[arg(long, env = "GTFS_DIR", default_value = "gtfs")]
    gtfs_dir: PathBuf,

    /// JSON file listing routes and stops to show (built-in board if omitted)
    #[arg(long, env = "BOARD_CONFIG")]
    config: Option<PathBuf>,
}

impl BoardArgs {
    fn board(&self) -> Result<BoardConfig> {
        match &self.config {
            Some(path) => BoardConfig::load(path),
            None => Ok(BoardConfig::default()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the board rows as a JSON array over HTTP
    Serve {
        #[command(flatten)]
        board: BoardArgs,

        /// Address to listen on
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        /// Listening port for the server
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Print the current board rows once
    Rows {
        #[command(flatten)]
        board: BoardArgs,
    },
    /// Download and unpack the static schedule archive
    FetchSchedule {
        /// Archive URL
        #[arg(long, env = "SCHEDULE_URL", default_value = DEFAULT_SCHEDULE_URL)]
        url: String,

        /// Directory to unpack into
        #[arg(short, long, env = "GTFS_DIR", default_value = "gtfs")]
        dir: PathBuf,

        /// Re-download when the unpacked schedule is older than this
        #[arg(long)]
        max_age_hours: Option<u64>,

        /// Download even if a schedule is already present
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Decode a GTFS-RT trip-update feed from a file or URL
    Realtime {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL", default_value = DEFAULT_TRIP_UPDATE_URL)]
        source: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/arrival_board.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("arrival_board.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { board, host, port } => {
            let config = board.board()?;
            info!(
                routes = config.routes.len(),
                stops = config.stops.len(),
                gtfs_dir = %board.gtfs_dir.display(),
                "Board configured"
            );
            let cache = ScheduleCache::new(ScheduleFiles::new(&board.gtfs_dir));
            serve(SocketAddr::new(host, port), AppState::new(cache, config)).await?;
        }
        Commands::Rows { board } => {
            let config = board.board()?;
            let files = ScheduleFiles::new(&board.gtfs_dir);
            let schedule = tokio::task::spawn_blocking(move || Schedule::load(&files))
                .await?
                .context("failed to load schedule")?;
            let rows = display_rows(&schedule, &config, &Local::now())?;
            println!("{}", serde_json::to_string(&rows)?);
        }
        Commands::FetchSchedule {
            url,
            dir,
            max_age_hours,
            force,
        } => {
            let max_age = max_age_hours.map(|hours| Duration::from_secs(hours * 60 * 60));
            if !force && !needs_refresh(&dir, max_age, SystemTime::now()) {
                info!(dir = %dir.display(), "Existing schedule directory found. Skipping.");
                return Ok(());
            }

            let client = BasicClient::with_timeout(HTTP_TIMEOUT)?;
            let written = fetch_schedule(&client, &url, &dir)
                .await
                .context("could not get latest schedule")?;
            info!(files = written.len(), dir = %dir.display(), "Schedule refreshed");
        }
        Commands::Realtime { source } => {
            let bytes = fetcher(&source).await?;
            let feed = parse_feed(&bytes)?;
            let trip_ids = trip_update_ids(&feed);

            info!(
                version = %feed.header.gtfs_realtime_version,
                timestamp = feed.header.timestamp,
                entities = feed.entity.len(),
                trip_updates = trip_ids.len(),
                "Feed decoded"
            );
            for trip_id in trip_ids {
                info!(trip_id, "Trip update");
            }
        }
    }

    Ok(())
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument]
async fn fetcher(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::with_timeout(HTTP_TIMEOUT)?;
        arrival_board::fetch::fetch_bytes(&client, source).await?.to_vec()
    } else {
        std::fs::read(source).with_context(|| format!("failed to read {source}"))?
    };
    Ok(bytes)
}
