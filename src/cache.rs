//! Shared, lazily reloaded schedule snapshot.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::schedule::{Schedule, ScheduleError, ScheduleFiles};

struct Snapshot {
    schedule: Arc<Schedule>,
    /// Modification time of the source files when the load began.
    source_modified: Option<SystemTime>,
}

impl Snapshot {
    fn is_fresh(&self, on_disk: Option<SystemTime>) -> bool {
        match (on_disk, self.source_modified) {
            (Some(on_disk), Some(loaded)) => loaded >= on_disk,
            (Some(_), None) => false,
            // Files unreadable right now: keep serving what we have.
            (None, _) => true,
        }
    }
}

/// Holds the current [`Schedule`] and reloads it when the files on disk change.
///
/// Readers share one `Arc<Schedule>`; reloads happen under the write lock so
/// at most one runs at a time.
pub struct ScheduleCache {
    files: ScheduleFiles,
    current: RwLock<Option<Snapshot>>,
}

impl ScheduleCache {
    pub fn new(files: ScheduleFiles) -> Self {
        Self {
            files,
            current: RwLock::new(None),
        }
    }

    /// Returns the current snapshot, loading or reloading it first if needed.
    pub async fn snapshot(&self) -> Result<Arc<Schedule>, ScheduleError> {
        let on_disk = self.files.modified();

        {
            let guard = self.current.read().await;
            if let Some(snapshot) = guard.as_ref().filter(|s| s.is_fresh(on_disk)) {
                return Ok(snapshot.schedule.clone());
            }
        }

        let mut guard = self.current.write().await;

        // Another caller may have reloaded while we waited for the lock.
        if let Some(snapshot) = guard.as_ref().filter(|s| s.is_fresh(on_disk)) {
            debug!("Schedule reloaded by another caller");
            return Ok(snapshot.schedule.clone());
        }

        let files = self.files.clone();
        let schedule = tokio::task::spawn_blocking(move || Schedule::load(&files)).await??;
        let schedule = Arc::new(schedule);

        info!(
            reloaded = guard.is_some(),
            dir = %self.files.dir.display(),
            "Schedule snapshot replaced"
        );

        *guard = Some(Snapshot {
            schedule: schedule.clone(),
            source_modified: on_disk,
        });

        Ok(schedule)
    }

    /// Drops the current snapshot so the next read reloads from disk.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}
