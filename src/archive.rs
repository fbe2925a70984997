//! Downloading and unpacking the static schedule archive.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::fetch::{FetchError, HttpClient, fetch_bytes};

pub const DEFAULT_SCHEDULE_URL: &str = "https://www.bart.gov/dev/schedules/google_transit.zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unreadable schedule archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive entry {name:?} would be written outside the schedule directory")]
    UnsafeEntry { name: String },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether a schedule directory has already been written.
pub fn schedule_is_present(dir: &Path) -> bool {
    dir.is_dir()
}

/// Time since the newest file in `dir` was written.
///
/// `None` when the directory is missing or holds no files.
pub fn schedule_age(dir: &Path, now: SystemTime) -> Option<Duration> {
    let newest = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok()?.metadata().ok())
        .filter(|meta| meta.is_file())
        .filter_map(|meta| meta.modified().ok())
        .max()?;

    Some(now.duration_since(newest).unwrap_or_default())
}

/// Decides whether the schedule in `dir` should be downloaded again.
///
/// Without a `max_age` an existing directory is always kept.
pub fn needs_refresh(dir: &Path, max_age: Option<Duration>, now: SystemTime) -> bool {
    if !schedule_is_present(dir) {
        return true;
    }

    match (max_age, schedule_age(dir, now)) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(max_age), Some(age)) => age > max_age,
    }
}

/// Downloads the archive at `url` and unpacks it into `dir`.
///
/// Returns the paths written.
#[tracing::instrument(skip(client, dir), fields(dir = %dir.display()))]
pub async fn fetch_schedule<C: HttpClient>(
    client: &C,
    url: &str,
    dir: &Path,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let bytes = fetch_bytes(client, url).await?;
    info!(bytes = bytes.len(), "Schedule archive downloaded");

    let written = extract_archive(&bytes, dir)?;
    info!(files = written.len(), "Schedule written");
    Ok(written)
}

/// Unpacks every entry of a zip archive held in memory into `dir`.
///
/// Entries are written under a staging directory first and then renamed
/// into place, so a reader of `dir` sees either the old file or the new one.
pub fn extract_archive(bytes: &[u8], dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;

    let staging = dir.join(STAGING_DIR);
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(io_err(&staging))?;
    }
    fs::create_dir(&staging).map_err(io_err(&staging))?;

    let result = unpack(bytes, &staging).and_then(|files| install(&staging, dir, files));

    if let Err(err) = fs::remove_dir_all(&staging) {
        debug!(path = %staging.display(), error = %err, "Staging directory left behind");
    }
    result
}

const STAGING_DIR: &str = ".extracting";

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + use<> {
    let path = path.to_path_buf();
    move |source| ArchiveError::Io { path, source }
}

/// Writes the archive's files under `staging`, returning their relative paths.
fn unpack(bytes: &[u8], staging: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafeEntry {
                name: entry.name().to_string(),
            })?;
        let target = staging.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut file = File::create(&target).map_err(io_err(&target))?;
        let copied = io::copy(&mut entry, &mut file).map_err(io_err(&target))?;
        debug!(path = %relative.display(), bytes = copied, "Extracted");

        files.push(relative);
    }

    Ok(files)
}

/// Renames each staged file over its counterpart in `dir`.
fn install(staging: &Path, dir: &Path, files: Vec<PathBuf>) -> Result<Vec<PathBuf>, ArchiveError> {
    files
        .into_iter()
        .map(|relative| {
            let target = dir.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            fs::rename(staging.join(&relative), &target).map_err(io_err(&target))?;
            Ok(target)
        })
        .collect()
}
