//! Retry queue for media folders orphaned by session deletes.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{upload::delete_folder, ObjectStore};
use crate::config::CleanupConfig;
use crate::db::{Database, PendingCleanup};

/// Try one queued folder. Success removes it from the queue; failure is
/// recorded and logged. Returns whether the folder is gone.
pub async fn attempt(db: &Database, store: &dyn ObjectStore, id: i64, slug: &str, max_attempts: i64) -> bool {
    match delete_folder(store, slug).await {
        Ok(deleted) => {
            if let Err(e) = db.complete_cleanup(id).await {
                tracing::warn!("Cleanup {} done ({} objects) but not dequeued: {}", id, deleted, e);
            }
            true
        }
        Err(e) => {
            let message = e.to_string();
            match db.record_cleanup_failure(id, &message).await {
                Ok(attempts) if attempts >= max_attempts => {
                    tracing::error!("Giving up on media for {} after {} attempts: {}", slug, attempts, message);
                }
                Ok(attempts) => {
                    tracing::warn!("Media cleanup for {} failed (attempt {}): {}", slug, attempts, message);
                }
                Err(db_err) => {
                    tracing::warn!("Media cleanup for {} failed: {}; recording failed: {}", slug, message, db_err);
                }
            }
            false
        }
    }
}

/// One pass over the queue, then drop exhausted jobs older than the
/// retention window. Returns how many folders were cleared.
pub async fn sweep(db: &Database, store: &dyn ObjectStore, config: &CleanupConfig) -> Result<usize, sqlx::Error> {
    let pending: Vec<PendingCleanup> = db.pending_cleanups(config.max_attempts).await?;
    let mut cleared = 0;
    for job in &pending {
        tracing::debug!(
            "Retrying cleanup {} for {} (queued {}, {} attempts, last error {:?})",
            job.id,
            job.slug,
            job.created_at,
            job.attempts,
            job.last_error
        );
        if attempt(db, store, job.id, &job.slug, config.max_attempts).await {
            cleared += 1;
        }
    }
    if !pending.is_empty() {
        tracing::info!("Cleanup sweep cleared {}/{} media folders", cleared, pending.len());
    }

    let cutoff = Utc::now() - chrono::Duration::days(config.abandoned_retention_days.max(0));
    for job in db.prune_abandoned_cleanups(config.max_attempts, cutoff).await? {
        tracing::error!(
            "Abandoned media folder {}/ left in storage after {} attempts (queued {}, last error {:?})",
            job.slug,
            job.attempts,
            job.created_at,
            job.last_error
        );
    }
    Ok(cleared)
}

pub fn spawn_sweeper(db: Database, store: Arc<dyn ObjectStore>, config: CleanupConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(e) = sweep(&db, store.as_ref(), &config).await {
                tracing::warn!("Cleanup sweep failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sessions_test_support::{insert, video_draft};
    use crate::storage::{LocalObjectStore, StorageError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Local store whose deletes fail until `healthy` is set
    struct FlakyStore {
        inner: LocalObjectStore,
        healthy: AtomicBool,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, StorageError> {
            self.inner.put(key, body, content_type).await
        }

        async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<String, StorageError> {
            self.inner.put_file(key, path, content_type).await
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("service unavailable".into()));
            }
            self.inner.delete(key).await
        }

        async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            self.inner.list_by_prefix(prefix).await
        }

        fn public_url(&self, key: &str) -> String {
            self.inner.public_url(key)
        }
    }

    fn flaky_store(dir: &tempfile::TempDir) -> FlakyStore {
        FlakyStore {
            inner: LocalObjectStore::new(dir.path(), "http://x"),
            healthy: AtomicBool::new(false),
        }
    }

    fn cleanup_config(max_attempts: i64) -> CleanupConfig {
        CleanupConfig {
            max_attempts,
            ..CleanupConfig::default()
        }
    }

    /// A deleted session whose video is still in `store`; returns its slug
    async fn orphaned_video(db: &Database, store: &FlakyStore, title: &str) -> (i64, String) {
        let session = insert(db, &video_draft(title)).await;
        let key = format!("{}/video.mp4", session.slug);
        store.put(&key, Bytes::from_static(b"mp4"), "video/mp4").await.unwrap();
        let deleted = db.delete_session(&session.id).await.unwrap().unwrap();
        (deleted.cleanup_id, deleted.slug)
    }

    #[tokio::test]
    async fn test_failed_cleanup_is_retried_by_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let store = flaky_store(&dir);
        let db = Database::in_memory().await.unwrap();
        let (cleanup_id, slug) = orphaned_video(&db, &store, "Flow").await;

        assert!(!attempt(&db, &store, cleanup_id, &slug, 5).await);
        assert_eq!(db.pending_cleanups(5).await.unwrap()[0].attempts, 1);

        store.healthy.store(true, Ordering::SeqCst);
        assert_eq!(sweep(&db, &store, &cleanup_config(5)).await.unwrap(), 1);
        assert!(db.pending_cleanups(5).await.unwrap().is_empty());
        assert!(store.list_by_prefix(&format!("{}/", slug)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_jobs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = flaky_store(&dir);
        let db = Database::in_memory().await.unwrap();
        let (_, slug) = orphaned_video(&db, &store, "Flow").await;

        assert_eq!(sweep(&db, &store, &cleanup_config(2)).await.unwrap(), 0);
        assert_eq!(sweep(&db, &store, &cleanup_config(2)).await.unwrap(), 0);

        // Two failures reach the limit; the job is kept but no longer picked up
        assert!(db.pending_cleanups(2).await.unwrap().is_empty());
        let kept = db.pending_cleanups(3).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].attempts, 2);
        assert!(kept[0].last_error.as_deref().unwrap().contains("service unavailable"));

        // A healthy store no longer matters once the job is exhausted
        store.healthy.store(true, Ordering::SeqCst);
        assert_eq!(sweep(&db, &store, &cleanup_config(2)).await.unwrap(), 0);
        assert_eq!(store.list_by_prefix(&format!("{}/", slug)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_prunes_abandoned_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = flaky_store(&dir);
        let db = Database::in_memory().await.unwrap();
        orphaned_video(&db, &store, "Flow").await;

        let config = CleanupConfig {
            abandoned_retention_days: 0,
            ..cleanup_config(1)
        };
        assert_eq!(sweep(&db, &store, &config).await.unwrap(), 0);
        assert!(db.pending_cleanups(10).await.unwrap().is_empty());
    }
}
