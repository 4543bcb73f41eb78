use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{ScheduleResponse, SessionForm, SessionInfo, VideoSort};
use uuid::Uuid;

use crate::{
    auth::AdminPrincipal,
    catalog::{listing, session_slug, SessionDraft},
    db::{DeletedSession, Session},
    error::{is_unique_violation, AppError, Result},
    state::AppState,
    storage::cleanup,
};

#[derive(Debug, Default, Deserialize)]
pub struct VideoQuery {
    pub sort: Option<String>,
    pub category: Option<String>,
    pub theme: Option<String>,
}

fn into_infos(sessions: Vec<Session>) -> Vec<SessionInfo> {
    sessions.into_iter().map(SessionInfo::from).collect()
}

async fn load_session(state: &AppState, id: &str) -> Result<Session> {
    state
        .db
        .get_session(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("session {}", id)))
}

/// Referenced category and theme must exist
async fn check_references(state: &AppState, draft: &SessionDraft) -> Result<()> {
    if let Some(category_id) = &draft.category_id {
        if state.db.get_category(category_id).await?.is_none() {
            return Err(AppError::not_found(format!("category {}", category_id)));
        }
    }
    if let Some(theme_id) = &draft.theme_id {
        if state.db.get_theme(theme_id).await?.is_none() {
            return Err(AppError::not_found(format!("theme {}", theme_id)));
        }
    }
    Ok(())
}

// ============================================================================
// Public listings
// ============================================================================

pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<Vec<SessionInfo>>> {
    let sort = match query.sort.as_deref() {
        Some(raw) => raw.parse::<VideoSort>().map_err(AppError::Validation)?,
        None => VideoSort::default(),
    };

    let sessions = state
        .db
        .list_published_sessions(query.category.as_deref(), query.theme.as_deref())
        .await?;

    Ok(Json(listing::videos(into_infos(sessions), sort)))
}

pub async fn schedule(State(state): State<AppState>) -> Result<Json<ScheduleResponse>> {
    let sessions = state.db.list_sessions(false).await?;
    Ok(Json(listing::schedule(into_infos(sessions), Utc::now())))
}

pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<SessionInfo>> {
    let session = state
        .db
        .get_session_by_slug(&slug)
        .await?
        .filter(|s| s.is_published)
        .ok_or_else(|| AppError::not_found(format!("session {}", slug)))?;

    Ok(Json(session.into()))
}

// ============================================================================
// Admin management
// ============================================================================

pub async fn admin_list(
    AdminPrincipal(_admin): AdminPrincipal,
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionInfo>>> {
    let sessions = state.db.list_sessions(true).await?;
    Ok(Json(into_infos(sessions)))
}

pub async fn create(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Json(form): Json<SessionForm>,
) -> Result<(StatusCode, Json<SessionInfo>)> {
    let draft = SessionDraft::from_form(form, None)?;
    check_references(&state, &draft).await?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let slug = session_slug(&draft.title, now.timestamp_millis());

    state
        .db
        .insert_session(&id, &slug, &draft, now)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("slug {} is already taken, try again", slug))
            } else {
                e.into()
            }
        })?;
    tracing::info!("Admin {} created session {} ({})", admin.user_id, id, slug);

    let session = load_session(&state, &id).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn update(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<SessionForm>,
) -> Result<Json<SessionInfo>> {
    let existing = load_session(&state, &id).await?;
    let draft = SessionDraft::from_form(form, Some(&existing))?;
    check_references(&state, &draft).await?;

    if !state.db.update_session(&id, &draft, Utc::now()).await? {
        return Err(AppError::not_found(format!("session {}", id)));
    }
    tracing::info!("Admin {} updated session {}", admin.user_id, id);

    let session = load_session(&state, &id).await?;
    Ok(Json(session.into()))
}

/// Removes the row, then its media folder. A media failure stays queued for
/// the sweeper and does not fail the request.
pub async fn delete(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let deleted: DeletedSession = state
        .db
        .delete_session(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("session {}", id)))?;
    tracing::info!("Admin {} deleted session {} ({})", admin.user_id, id, deleted.slug);

    let media_cleared = cleanup::attempt(
        &state.db,
        state.store.as_ref(),
        deleted.cleanup_id,
        &deleted.slug,
        state.config.cleanup.max_attempts,
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "media_cleared": media_cleared,
    })))
}

pub async fn go_live(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>> {
    if !state.db.go_live(&id).await? {
        let session = load_session(&state, &id).await?;
        return Err(AppError::validation(format!(
            "{} is not a scheduled live class",
            session.slug
        )));
    }
    tracing::info!("Admin {} put session {} on air", admin.user_id, id);

    let session = load_session(&state, &id).await?;
    Ok(Json(session.into()))
}

/// Clears the streaming marker only if it still points at `id`
pub async fn end_stream(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>> {
    load_session(&state, &id).await?;

    if state.db.end_stream(&id).await? {
        tracing::info!("Admin {} ended stream for {}", admin.user_id, id);
    } else {
        tracing::debug!("Session {} was not streaming; end-stream is a no-op", id);
    }

    let session = load_session(&state, &id).await?;
    Ok(Json(session.into()))
}
