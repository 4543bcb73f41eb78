use chrono::{DateTime, Utc};

use super::{Database, Session};
use crate::catalog::SessionDraft;

const SESSION_COLUMNS: &str = r#"
    SELECT s.id, s.slug, s.title, s.description, s.thumbnail_url, s.video_url,
           s.duration_minutes, s.difficulty, s.category_id, s.theme_id,
           s.is_published, s.is_live, s.live_at,
           CASE WHEN ls.session_id = s.id THEN 1 ELSE 0 END AS streaming_now,
           s.created_at, s.updated_at
    FROM sessions s
    LEFT JOIN live_state ls ON ls.slot = 1
"#;

/// What a session delete left behind for the media sweeper
#[derive(Debug, Clone)]
pub struct DeletedSession {
    pub slug: String,
    pub cleanup_id: i64,
}

impl Database {
    /// All sessions; drafts only when `include_drafts` is set
    pub async fn list_sessions(&self, include_drafts: bool) -> Result<Vec<Session>, sqlx::Error> {
        let sql = if include_drafts {
            format!("{} ORDER BY s.created_at DESC", SESSION_COLUMNS)
        } else {
            format!("{} WHERE s.is_published = 1 ORDER BY s.created_at DESC", SESSION_COLUMNS)
        };
        sqlx::query_as::<_, Session>(&sql).fetch_all(&self.pool).await
    }

    /// Published sessions, optionally restricted to a category and/or theme slug
    pub async fn list_published_sessions(
        &self,
        category_slug: Option<&str>,
        theme_slug: Option<&str>,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let sql = format!(
            r#"{}
            LEFT JOIN categories c ON c.id = s.category_id
            LEFT JOIN themes t ON t.id = s.theme_id
            WHERE s.is_published = 1
              AND (?1 IS NULL OR c.slug = ?1)
              AND (?2 IS NULL OR t.slug = ?2)
            "#,
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, Session>(&sql)
            .bind(category_slug)
            .bind(theme_slug)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, sqlx::Error> {
        let sql = format!("{} WHERE s.id = ?", SESSION_COLUMNS);
        sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_session_by_slug(&self, slug: &str) -> Result<Option<Session>, sqlx::Error> {
        let sql = format!("{} WHERE s.slug = ?", SESSION_COLUMNS);
        sqlx::query_as::<_, Session>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_session(
        &self,
        id: &str,
        slug: &str,
        draft: &SessionDraft,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, slug, title, description, thumbnail_url, video_url, duration_minutes,
                difficulty, category_id, theme_id, is_published, is_live, live_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(slug)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.thumbnail_url)
        .bind(&draft.video_url)
        .bind(draft.duration_minutes)
        .bind(draft.difficulty.map(|d| d.as_str()))
        .bind(&draft.category_id)
        .bind(&draft.theme_id)
        .bind(draft.is_published)
        .bind(draft.is_live)
        .bind(draft.live_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rewrites every mutable field. The slug is never touched.
    pub async fn update_session(
        &self,
        id: &str,
        draft: &SessionDraft,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                title = ?, description = ?, thumbnail_url = ?, video_url = ?,
                duration_minutes = ?, difficulty = ?, category_id = ?, theme_id = ?,
                is_published = ?, is_live = ?, live_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.thumbnail_url)
        .bind(&draft.video_url)
        .bind(draft.duration_minutes)
        .bind(draft.difficulty.map(|d| d.as_str()))
        .bind(&draft.category_id)
        .bind(&draft.theme_id)
        .bind(draft.is_published)
        .bind(draft.is_live)
        .bind(draft.live_at)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Removes the session with its favorites and live-state reference and
    /// queues its media folder for deletion, all in one transaction.
    pub async fn delete_session(&self, id: &str) -> Result<Option<DeletedSession>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let slug: Option<String> = sqlx::query_scalar("SELECT slug FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(slug) = slug else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM favorites WHERE session_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE live_state SET session_id = NULL, updated_at = ? WHERE session_id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let cleanup_id = sqlx::query(
            "INSERT INTO pending_cleanup (slug, attempts, created_at) VALUES (?, 0, ?)",
        )
        .bind(&slug)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        Ok(Some(DeletedSession { slug, cleanup_id }))
    }

    /// Points the live-state record at `id`, displacing whichever session was
    /// streaming. Returns false when the session does not exist or is not a
    /// scheduled live class.
    pub async fn go_live(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO live_state (slot, session_id, updated_at)
            SELECT 1, id, ? FROM sessions WHERE id = ? AND is_live = 1 AND live_at IS NOT NULL
            ON CONFLICT(slot) DO UPDATE SET
                session_id = excluded.session_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clears the live-state record only if `id` is the one streaming.
    /// Returns whether it was.
    pub async fn end_stream(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE live_state SET session_id = NULL, updated_at = ? WHERE slot = 1 AND session_id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn streaming_session_id(&self) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>("SELECT session_id FROM live_state WHERE slot = 1")
            .fetch_optional(&self.pool)
            .await
            .map(Option::flatten)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::db::test_support::user;

    async fn streaming_ids(db: &Database) -> Vec<String> {
        db.list_sessions(true)
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.streaming_now)
            .map(|s| s.id)
            .collect()
    }

    #[tokio::test]
    async fn test_at_most_one_streaming_session() {
        let db = Database::in_memory().await.unwrap();
        let a = insert(&db, &live_draft("Morning Live", 1)).await;
        let b = insert(&db, &live_draft("Evening Live", 8)).await;
        let c = insert(&db, &live_draft("Late Live", 20)).await;

        for id in [&a.id, &b.id, &c.id, &a.id, &b.id] {
            assert!(db.go_live(id).await.unwrap());
            assert_eq!(streaming_ids(&db).await, vec![id.clone()]);
        }
    }

    #[tokio::test]
    async fn test_videos_cannot_go_live() {
        let db = Database::in_memory().await.unwrap();
        let a = insert(&db, &live_draft("Morning Live", 1)).await;
        let v = insert(&db, &video_draft("Recorded Flow")).await;
        assert!(db.go_live(&a.id).await.unwrap());

        assert!(!db.go_live(&v.id).await.unwrap());
        assert_eq!(streaming_ids(&db).await, vec![a.id.clone()]);
    }

    #[tokio::test]
    async fn test_go_live_unknown_session() {
        let db = Database::in_memory().await.unwrap();
        let a = insert(&db, &live_draft("Morning Live", 1)).await;
        assert!(db.go_live(&a.id).await.unwrap());

        assert!(!db.go_live("missing").await.unwrap());
        assert_eq!(db.streaming_session_id().await.unwrap(), Some(a.id));
    }

    #[tokio::test]
    async fn test_end_stream_only_clears_target() {
        let db = Database::in_memory().await.unwrap();
        let a = insert(&db, &live_draft("Morning Live", 1)).await;
        let b = insert(&db, &live_draft("Evening Live", 8)).await;

        db.go_live(&a.id).await.unwrap();
        assert!(!db.end_stream(&b.id).await.unwrap());
        assert_eq!(streaming_ids(&db).await, vec![a.id.clone()]);

        assert!(db.end_stream(&a.id).await.unwrap());
        assert!(streaming_ids(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_slug() {
        let db = Database::in_memory().await.unwrap();
        let s = insert(&db, &video_draft("Morning Vinyasa Flow!!")).await;

        let renamed = SessionDraft {
            title: "Completely New Title".into(),
            ..video_draft("ignored")
        };
        assert!(db.update_session(&s.id, &renamed, Utc::now()).await.unwrap());

        let stored = db.get_session(&s.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Completely New Title");
        assert_eq!(stored.slug, s.slug);
        assert!(stored.slug.starts_with("morning-vinyasa-flow-"));
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public_listing() {
        let db = Database::in_memory().await.unwrap();
        insert(&db, &video_draft("Published")).await;
        insert(
            &db,
            &SessionDraft {
                is_published: false,
                ..video_draft("Draft")
            },
        )
        .await;

        assert_eq!(db.list_sessions(false).await.unwrap().len(), 1);
        assert_eq!(db.list_sessions(true).await.unwrap().len(), 2);
        assert_eq!(db.list_published_sessions(None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_queues_cleanup() {
        let db = Database::in_memory().await.unwrap();
        let alice = user(&db, "alice@example.com").await;
        let s = insert(&db, &live_draft("Morning Live", 1)).await;
        db.go_live(&s.id).await.unwrap();
        db.insert_favorite(&alice.id, &s.id).await.unwrap();

        let deleted = db.delete_session(&s.id).await.unwrap().unwrap();
        assert_eq!(deleted.slug, s.slug);

        assert!(db.get_session(&s.id).await.unwrap().is_none());
        assert_eq!(db.streaming_session_id().await.unwrap(), None);
        assert!(!db.favorite_exists(&alice.id, &s.id).await.unwrap());

        let pending = db.pending_cleanups(5).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, deleted.cleanup_id);
        assert_eq!(pending[0].slug, s.slug);
    }

    #[tokio::test]
    async fn test_delete_missing_session() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.delete_session("missing").await.unwrap().is_none());
        assert!(db.pending_cleanups(5).await.unwrap().is_empty());
    }
}
