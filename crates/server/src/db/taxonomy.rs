use chrono::Utc;

use super::{Category, Database, Theme};
use crate::catalog::TaxonomyDraft;

impl Database {
    // Category operations
    pub async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, slug, description FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_category(&self, id: &str, slug: &str, draft: &TaxonomyDraft) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO categories (id, name, slug, description, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(&draft.name)
            .bind(slug)
            .bind(&draft.description)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_category(&self, id: &str, draft: &TaxonomyDraft) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE categories SET name = ?, description = ? WHERE id = ?")
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Sessions in the category are kept and lose their category reference
    pub async fn delete_category(&self, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE sessions SET category_id = NULL WHERE category_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    // Theme operations
    pub async fn list_themes(&self) -> Result<Vec<Theme>, sqlx::Error> {
        sqlx::query_as::<_, Theme>("SELECT id, name, slug, description, color FROM themes ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_theme(&self, id: &str) -> Result<Option<Theme>, sqlx::Error> {
        sqlx::query_as::<_, Theme>("SELECT id, name, slug, description, color FROM themes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_theme(&self, id: &str, slug: &str, draft: &TaxonomyDraft) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO themes (id, name, slug, description, color, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(slug)
        .bind(&draft.description)
        .bind(&draft.color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_theme(&self, id: &str, draft: &TaxonomyDraft) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE themes SET name = ?, description = ?, color = ? WHERE id = ?")
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(&draft.color)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Sessions with the theme are kept and lose their theme reference
    pub async fn delete_theme(&self, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE sessions SET theme_id = NULL WHERE theme_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM themes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sessions::test_support::{insert, video_draft};
    use crate::catalog::SessionDraft;

    fn draft(name: &str) -> TaxonomyDraft {
        TaxonomyDraft {
            name: name.to_string(),
            description: None,
            color: Some("#88aa77".into()),
        }
    }

    #[tokio::test]
    async fn test_delete_category_orphans_sessions() {
        let db = Database::in_memory().await.unwrap();
        db.insert_category("cat-1", "vinyasa", &draft("Vinyasa")).await.unwrap();
        let s = insert(
            &db,
            &SessionDraft {
                category_id: Some("cat-1".into()),
                ..video_draft("Flow")
            },
        )
        .await;

        assert!(db.delete_category("cat-1").await.unwrap());
        let stored = db.get_session(&s.id).await.unwrap().unwrap();
        assert_eq!(stored.category_id, None);
    }

    #[tokio::test]
    async fn test_delete_theme_orphans_sessions() {
        let db = Database::in_memory().await.unwrap();
        db.insert_theme("theme-1", "calm", &draft("Calm")).await.unwrap();
        let s = insert(
            &db,
            &SessionDraft {
                theme_id: Some("theme-1".into()),
                ..video_draft("Slow")
            },
        )
        .await;

        assert!(db.delete_theme("theme-1").await.unwrap());
        assert!(!db.delete_theme("theme-1").await.unwrap());
        assert_eq!(db.get_session(&s.id).await.unwrap().unwrap().theme_id, None);
    }

    #[tokio::test]
    async fn test_category_slug_is_unique() {
        let db = Database::in_memory().await.unwrap();
        db.insert_category("a", "hatha", &draft("Hatha")).await.unwrap();
        let err = db.insert_category("b", "hatha", &draft("Hatha")).await.unwrap_err();
        assert!(crate::error::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_filter_published_by_taxonomy() {
        let db = Database::in_memory().await.unwrap();
        db.insert_category("cat-1", "vinyasa", &draft("Vinyasa")).await.unwrap();
        db.insert_theme("theme-1", "calm", &draft("Calm")).await.unwrap();
        insert(
            &db,
            &SessionDraft {
                category_id: Some("cat-1".into()),
                theme_id: Some("theme-1".into()),
                ..video_draft("Both")
            },
        )
        .await;
        insert(
            &db,
            &SessionDraft {
                category_id: Some("cat-1".into()),
                ..video_draft("Category only")
            },
        )
        .await;
        insert(&db, &video_draft("Neither")).await;

        let by_category = db.list_published_sessions(Some("vinyasa"), None).await.unwrap();
        assert_eq!(by_category.len(), 2);
        let by_both = db.list_published_sessions(Some("vinyasa"), Some("calm")).await.unwrap();
        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both[0].title, "Both");
    }
}
