use axum::{
    extract::{Path, State},
    Json,
};
use shared::{FavoriteToggleResponse, FavoritesResponse, SessionInfo};

use crate::{
    auth::Principal,
    db::FavoriteInsert,
    error::{AppError, Result},
    state::AppState,
};

pub async fn list(principal: Principal, State(state): State<AppState>) -> Result<Json<FavoritesResponse>> {
    let sessions = state.db.list_favorite_sessions(&principal.user_id).await?;
    Ok(Json(FavoritesResponse {
        sessions: sessions.into_iter().map(SessionInfo::from).collect(),
    }))
}

/// Anonymous callers get a sign-in prompt instead of an error. A lost race
/// between two toggles still ends favorited.
pub async fn toggle(
    principal: Option<Principal>,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<FavoriteToggleResponse>> {
    let Some(principal) = principal else {
        return Ok(Json(FavoriteToggleResponse {
            session_id,
            favorited: false,
            requires_sign_in: true,
        }));
    };

    if state.db.get_session(&session_id).await?.is_none() {
        return Err(AppError::not_found(format!("session {}", session_id)));
    }

    let favorited = if state.db.favorite_exists(&principal.user_id, &session_id).await? {
        // Someone else may have removed it already; either way it is gone
        state.db.delete_favorite(&principal.user_id, &session_id).await?;
        false
    } else {
        match state.db.insert_favorite(&principal.user_id, &session_id).await? {
            FavoriteInsert::Inserted => {}
            FavoriteInsert::AlreadyPresent => {
                tracing::debug!("Favorite {} for {} already present", session_id, principal.user_id);
            }
        }
        true
    };

    Ok(Json(FavoriteToggleResponse {
        session_id,
        favorited,
        requires_sign_in: false,
    }))
}
