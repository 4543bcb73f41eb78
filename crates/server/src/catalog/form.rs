use chrono::{DateTime, Utc};
use shared::{Difficulty, SessionForm, TaxonomyForm};

use crate::db::Session;
use crate::error::{AppError, Result};

/// Validated session fields, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub category_id: Option<String>,
    pub theme_id: Option<String>,
    pub is_published: bool,
    pub is_live: bool,
    pub live_at: Option<DateTime<Utc>>,
}

impl SessionDraft {
    /// `existing` is the stored session on update, `None` on create.
    pub fn from_form(form: SessionForm, existing: Option<&Session>) -> Result<Self> {
        let title = form.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title is required"));
        }

        if let Some(minutes) = form.duration_minutes {
            if minutes <= 0 {
                return Err(AppError::validation("duration_minutes must be a positive number of minutes"));
            }
        }

        let (live_at, video_url) = if form.is_live {
            let live_at = form
                .live_at
                .ok_or_else(|| AppError::validation("live_at is required for a live session"))?;
            (Some(live_at), None)
        } else {
            (None, non_empty(form.video_url))
        };

        let is_published = form
            .is_published
            .unwrap_or_else(|| existing.map(|s| s.is_published).unwrap_or(true));

        Ok(Self {
            title: title.to_string(),
            description: non_empty(form.description),
            thumbnail_url: non_empty(form.thumbnail_url),
            video_url,
            duration_minutes: form.duration_minutes,
            difficulty: form.difficulty,
            category_id: non_empty(form.category_id),
            theme_id: non_empty(form.theme_id),
            is_published,
            is_live: form.is_live,
            live_at,
        })
    }
}

/// Validated category/theme fields
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyDraft {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl TaxonomyDraft {
    pub fn from_form(form: TaxonomyForm) -> Result<Self> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if super::slugify(name).is_empty() {
            return Err(AppError::validation("name must contain at least one letter or digit"));
        }
        Ok(Self {
            name: name.to_string(),
            description: non_empty(form.description),
            color: non_empty(form.color),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn form(title: &str) -> SessionForm {
        SessionForm {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_required() {
        let err = SessionDraft::from_form(form("   "), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("title")));
    }

    #[test]
    fn test_duration_must_be_positive() {
        let mut f = form("Hatha");
        f.duration_minutes = Some(0);
        assert!(matches!(
            SessionDraft::from_form(f, None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_live_at_dropped_for_videos() {
        let mut f = form("Hatha");
        f.live_at = Some(Utc::now());
        f.video_url = Some("https://cdn/v.mp4".into());

        let draft = SessionDraft::from_form(f, None).unwrap();
        assert_eq!(draft.live_at, None);
        assert_eq!(draft.video_url.as_deref(), Some("https://cdn/v.mp4"));
    }

    #[test]
    fn test_live_session_keeps_schedule_and_drops_video() {
        let start = Utc::now() + Duration::hours(3);
        let mut f = form("Sunrise Live");
        f.is_live = true;
        f.live_at = Some(start);
        f.video_url = Some("https://cdn/v.mp4".into());

        let draft = SessionDraft::from_form(f, None).unwrap();
        assert_eq!(draft.live_at, Some(start));
        assert_eq!(draft.video_url, None);
    }

    #[test]
    fn test_live_session_requires_start_time() {
        let mut f = form("Sunrise Live");
        f.is_live = true;
        assert!(matches!(
            SessionDraft::from_form(f, None),
            Err(AppError::Validation(msg)) if msg.contains("live_at")
        ));
    }

    #[test]
    fn test_published_by_default_on_create() {
        let draft = SessionDraft::from_form(form("Yin"), None).unwrap();
        assert!(draft.is_published);

        let mut f = form("Yin");
        f.is_published = Some(false);
        assert!(!SessionDraft::from_form(f, None).unwrap().is_published);
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        let mut f = form("  Restorative  ");
        f.description = Some("   ".into());
        f.category_id = Some(String::new());

        let draft = SessionDraft::from_form(f, None).unwrap();
        assert_eq!(draft.title, "Restorative");
        assert_eq!(draft.description, None);
        assert_eq!(draft.category_id, None);
    }

    #[test]
    fn test_taxonomy_name_required() {
        let err = TaxonomyDraft::from_form(TaxonomyForm {
            name: "!!".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
