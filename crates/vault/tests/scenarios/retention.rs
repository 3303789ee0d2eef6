//! Retention over a real remote directory

use crate::common::{remote_store, snapshot_bytes_aged};
use chrono::{Duration, Utc};
use tempfile::TempDir;
use vault::{BuildMode, RetentionPolicy};

#[tokio::test]
async fn test_seven_backups_keep_five_most_recent() {
    let temp_dir = TempDir::new().unwrap();
    let remote = remote_store(temp_dir.path(), BuildMode::Prod);

    for days in [40, 31, 10, 5, 3, 1, 0] {
        remote
            .create(&snapshot_bytes_aged(Duration::days(days)))
            .await
            .unwrap();
    }
    assert_eq!(remote.list().await.unwrap().len(), 7);

    let report = RetentionPolicy::default().apply(&remote).await;
    assert_eq!(report.deleted.len(), 2);
    assert!(report.failed.is_empty());

    let now = Utc::now();
    let remaining = remote.list().await.unwrap();
    assert_eq!(remaining.len(), 5);
    let oldest = remaining.last().unwrap();
    assert!(oldest.age(now) < Duration::days(11));
    assert!(oldest.age(now) > Duration::days(9));
}

#[tokio::test]
async fn test_dev_backups_are_not_counted_against_prod() {
    let temp_dir = TempDir::new().unwrap();
    let prod = remote_store(temp_dir.path(), BuildMode::Prod);
    let dev = remote_store(temp_dir.path(), BuildMode::Dev);

    for hours in 0..6 {
        prod.create(&snapshot_bytes_aged(Duration::hours(hours)))
            .await
            .unwrap();
    }
    for hours in 10..13 {
        dev.create(&snapshot_bytes_aged(Duration::hours(hours)))
            .await
            .unwrap();
    }

    let report = RetentionPolicy::default().apply(&prod).await;
    assert_eq!(report.deleted.len(), 1);

    let listed = prod.list().await.unwrap();
    assert_eq!(listed.iter().filter(|r| r.is_dev()).count(), 3);
    assert_eq!(listed.iter().filter(|r| !r.is_dev()).count(), 5);
}

#[tokio::test]
async fn test_retention_on_unreachable_remote_is_silent() {
    let temp_dir = TempDir::new().unwrap();
    let remote = vault::RemoteStore::new(
        temp_dir.path().join("not/mounted/backups"),
        std::sync::Arc::new(vault::AlwaysOnline),
    );

    let report = RetentionPolicy::default().apply(&remote).await;
    assert!(report.deleted.is_empty());
    assert!(report.failed.is_empty());
}
