use chrono::{DateTime, Utc};
use shared::{CategoryInfo, SessionInfo, ThemeInfo, UserInfo};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.id,
            email: user.email,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Session row joined with the live-state record
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i64>,
    pub difficulty: Option<String>,
    pub category_id: Option<String>,
    pub theme_id: Option<String>,
    pub is_published: bool,
    pub is_live: bool,
    pub live_at: Option<DateTime<Utc>>,
    pub streaming_now: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(s: Session) -> Self {
        let difficulty = s.difficulty.as_deref().and_then(|d| match d.parse() {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!("Session {} has {}", s.id, e);
                None
            }
        });

        SessionInfo {
            id: s.id,
            slug: s.slug,
            title: s.title,
            description: s.description,
            thumbnail_url: s.thumbnail_url,
            video_url: s.video_url,
            duration_minutes: s.duration_minutes,
            difficulty,
            category_id: s.category_id,
            theme_id: s.theme_id,
            is_published: s.is_published,
            is_live: s.is_live,
            live_at: s.live_at,
            streaming_now: s.streaming_now,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl From<Category> for CategoryInfo {
    fn from(c: Category) -> Self {
        CategoryInfo {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl From<Theme> for ThemeInfo {
    fn from(t: Theme) -> Self {
        ThemeInfo {
            id: t.id,
            name: t.name,
            slug: t.slug,
            description: t.description,
            color: t.color,
        }
    }
}

/// A media folder still waiting to be removed from object storage
#[derive(Debug, Clone, FromRow)]
pub struct PendingCleanup {
    pub id: i64,
    pub slug: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Difficulty;

    fn row(difficulty: Option<&str>) -> Session {
        let now = Utc::now();
        Session {
            id: "s1".into(),
            slug: "flow-1".into(),
            title: "Flow".into(),
            description: None,
            thumbnail_url: None,
            video_url: None,
            duration_minutes: Some(30),
            difficulty: difficulty.map(str::to_string),
            category_id: None,
            theme_id: None,
            is_published: true,
            is_live: false,
            live_at: None,
            streaming_now: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stored_difficulty_is_parsed() {
        let info = SessionInfo::from(row(Some("intermediate")));
        assert_eq!(info.difficulty, Some(Difficulty::Intermediate));
    }

    #[test]
    fn test_unknown_stored_difficulty_is_dropped() {
        assert_eq!(SessionInfo::from(row(Some("expert"))).difficulty, None);
        assert_eq!(SessionInfo::from(row(None)).difficulty, None);
    }
}
