use chrono::{DateTime, Utc};

use super::{Database, PendingCleanup};

impl Database {
    /// Queued media folders that have not exhausted their attempts, oldest first
    pub async fn pending_cleanups(&self, max_attempts: i64) -> Result<Vec<PendingCleanup>, sqlx::Error> {
        sqlx::query_as::<_, PendingCleanup>(
            r#"
            SELECT id, slug, attempts, last_error, created_at
            FROM pending_cleanup
            WHERE attempts < ?
            ORDER BY id ASC
            "#,
        )
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn complete_cleanup(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM pending_cleanup WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes exhausted jobs queued before `cutoff` and returns them
    pub async fn prune_abandoned_cleanups(
        &self,
        max_attempts: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PendingCleanup>, sqlx::Error> {
        sqlx::query_as::<_, PendingCleanup>(
            r#"
            DELETE FROM pending_cleanup
            WHERE attempts >= ? AND created_at < ?
            RETURNING id, slug, attempts, last_error, created_at
            "#,
        )
        .bind(max_attempts)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// Returns the attempt count after this failure
    pub async fn record_cleanup_failure(&self, id: i64, error: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE pending_cleanup SET attempts = attempts + 1, last_error = ? WHERE id = ? RETURNING attempts",
        )
        .bind(error)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map(|attempts| attempts.unwrap_or_default())
    }
}
