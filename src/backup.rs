//! Backup manager
//!
//! Produces timestamped snapshots of the database and enforces a bounded
//! retention window. Snapshots go through the store's consistent-snapshot
//! export, never a raw file copy, so a backup taken while the dispatcher is
//! writing is still a valid database.
//!
//! The schedule loop polls a daily wall-clock trigger at a coarse interval
//! and selects on a shutdown channel, so it can be stopped promptly and
//! tested without real waits. Missed triggers (process down at trigger
//! time) are skipped, not caught up.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime};
use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::BackupConfig;
use crate::store::Store;

/// Snapshot file name timestamp; lexicographic order equals time order
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Creates, prunes and schedules database snapshots
pub struct BackupManager {
    db_path: PathBuf,
    backup_dir: PathBuf,
    prefix: String,
    keep: usize,
    daily_at: NaiveTime,
    poll_interval: Duration,
}

impl BackupManager {
    pub fn new(db_path: impl Into<PathBuf>, config: &BackupConfig) -> Result<Self> {
        let daily_at = NaiveTime::parse_from_str(&config.daily_at, "%H:%M")
            .context(format!("Invalid backup trigger time: {}", config.daily_at))?;
        Ok(Self {
            db_path: db_path.into(),
            backup_dir: config.dir.clone(),
            prefix: config.prefix.clone(),
            keep: config.keep,
            daily_at,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    /// Snapshot the database into a new timestamped artifact and prune old
    /// ones. Returns the artifact path.
    pub fn create_backup(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.backup_dir).context("Failed to create backup directory")?;

        let stamp = Local::now().format(STAMP_FORMAT);
        let dest = self.backup_dir.join(format!("{}_{}.db", self.prefix, stamp));

        let source = Store::open_read_only(&self.db_path).context("Failed to open database for backup")?;
        source.snapshot_to(&dest).context("Failed to write snapshot")?;

        info!(dest = %dest.display(), "Backup created");
        self.cleanup_old_backups(self.keep)?;
        Ok(dest)
    }

    /// Keep only the `keep` most recent snapshots, by name order. Safe to
    /// call with fewer artifacts present. Returns how many were removed.
    pub fn cleanup_old_backups(&self, keep: usize) -> Result<usize> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| name.starts_with(&format!("{}_", self.prefix)) && name.ends_with(".db"))
                .collect(),
            // No directory means nothing to prune
            Err(_) => return Ok(0),
        };

        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut removed = 0;
        for old in names.iter().skip(keep) {
            let path = self.backup_dir.join(old);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Pruned old backup");
                    removed += 1;
                }
                Err(err) => warn!(path = %path.display(), error = %err, "Failed to prune backup"),
            }
        }
        Ok(removed)
    }

    /// Run the daily schedule until the shutdown channel fires
    ///
    /// Failures are logged and the loop continues; at most one backup is
    /// attempted per calendar day.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let now = Local::now();
        // A trigger time already past at startup was missed, not pending
        let mut last_attempt: Option<NaiveDate> = (now.time() >= self.daily_at).then(|| now.date_naive());

        info!(
            daily_at = %self.daily_at,
            poll_secs = self.poll_interval.as_secs(),
            "Backup scheduler started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Local::now();
                    if backup_due(now.time(), now.date_naive(), self.daily_at, last_attempt) {
                        last_attempt = Some(now.date_naive());
                        match self.create_backup() {
                            Ok(path) => info!(path = %path.display(), "Scheduled backup complete"),
                            Err(err) => error!(error = %err, "Scheduled backup failed"),
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Backup scheduler stopped");
    }
}

/// Pure trigger decision: due once the wall clock passes the trigger time,
/// at most once per calendar day
pub fn backup_due(time: NaiveTime, date: NaiveDate, trigger: NaiveTime, last_attempt: Option<NaiveDate>) -> bool {
    time >= trigger && last_attempt.is_none_or(|d| d < date)
}
