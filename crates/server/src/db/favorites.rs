use chrono::Utc;

use super::{Database, Session};
use crate::error::is_unique_violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteInsert {
    Inserted,
    /// Another request stored the same pair first
    AlreadyPresent,
}

impl Database {
    pub async fn favorite_exists(&self, user_id: &str, session_id: &str) -> Result<bool, sqlx::Error> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM favorites WHERE user_id = ? AND session_id = ?")
                .bind(user_id)
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    pub async fn insert_favorite(&self, user_id: &str, session_id: &str) -> Result<FavoriteInsert, sqlx::Error> {
        let result = sqlx::query("INSERT INTO favorites (user_id, session_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(session_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(FavoriteInsert::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(FavoriteInsert::AlreadyPresent),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_favorite(&self, user_id: &str, session_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND session_id = ?")
            .bind(user_id)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Favorited published sessions, most recently favorited first
    pub async fn list_favorite_sessions(&self, user_id: &str) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT s.id, s.slug, s.title, s.description, s.thumbnail_url, s.video_url,
                   s.duration_minutes, s.difficulty, s.category_id, s.theme_id,
                   s.is_published, s.is_live, s.live_at,
                   CASE WHEN ls.session_id = s.id THEN 1 ELSE 0 END AS streaming_now,
                   s.created_at, s.updated_at
            FROM favorites f
            JOIN sessions s ON s.id = f.session_id
            LEFT JOIN live_state ls ON ls.slot = 1
            WHERE f.user_id = ? AND s.is_published = 1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
