//! Retention policy for remote backups

use crate::record::BackupRecord;
use crate::remote::RemoteStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Age and count bounds on the remote backups of one build mode
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Backups older than this are evicted (default: 30 days)
    pub max_age: Duration,
    /// Number of most recent backups to keep (default: 5)
    pub max_count: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::days(30),
            max_count: 5,
        }
    }
}

/// Outcome of one cleanup run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl RetentionPolicy {
    pub fn new(max_age: Duration, max_count: usize) -> Self {
        Self { max_age, max_count }
    }

    /// Records to evict from a newest-first listing
    ///
    /// The union of every record older than `max_age` and every record past
    /// the `max_count` most recent, each file at most once.
    pub fn select_evictions<'a>(
        &self,
        records: &'a [BackupRecord],
        now: DateTime<Utc>,
    ) -> Vec<&'a BackupRecord> {
        let mut newest_first: Vec<&BackupRecord> = records.iter().collect();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut seen = HashSet::new();
        newest_first
            .into_iter()
            .enumerate()
            .filter(|(position, record)| {
                record.age(now) > self.max_age || *position >= self.max_count
            })
            .map(|(_, record)| record)
            .filter(|record| seen.insert(record.file_name.clone()))
            .collect()
    }

    /// Evict from the remote store. Never fails: problems are logged and
    /// reported, the backup that triggered cleanup stays successful.
    pub async fn apply(&self, remote: &RemoteStore) -> RetentionReport {
        let mut report = RetentionReport::default();

        let records = match remote.list().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Retention skipped, cannot list backups: {}", e);
                return report;
            }
        };

        // Dev and prod backups never evict each other
        let dev = remote.build_mode().is_dev();
        let scoped: Vec<BackupRecord> = records.into_iter().filter(|r| r.is_dev() == dev).collect();

        let evictions = self.select_evictions(&scoped, Utc::now());
        if evictions.is_empty() {
            debug!("Retention: nothing to evict among {} backups", scoped.len());
            return report;
        }

        for record in evictions {
            match remote.delete(record).await {
                Ok(()) => report.deleted.push(record.file_name.clone()),
                Err(e) => {
                    warn!(file = %record.file_name, "Retention could not delete backup: {}", e);
                    report.failed.push(record.file_name.clone());
                }
            }
        }

        info!(
            "Retention evicted {} backups ({} failed)",
            report.deleted.len(),
            report.failed.len()
        );
        report
    }
}
