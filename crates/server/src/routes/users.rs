use axum::{
    extract::{Path, State},
    Json,
};
use shared::{SetAdminRequest, UserInfo};

use crate::{
    auth::AdminPrincipal,
    error::{AppError, Result},
    state::AppState,
};

pub async fn list(
    AdminPrincipal(_admin): AdminPrincipal,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserInfo>>> {
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// Grant or revoke admin. Tokens already issued to the target keep their
/// embedded claim until it ages past `claim_ttl_secs`.
pub async fn set_admin(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetAdminRequest>,
) -> Result<Json<UserInfo>> {
    if !state.db.set_user_admin(&id, req.is_admin).await? {
        return Err(AppError::not_found(format!("user {}", id)));
    }
    tracing::info!("Admin {} set is_admin={} for {}", admin.user_id, req.is_admin, id);

    let user = state
        .db
        .get_user_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {}", id)))?;
    Ok(Json(user.into()))
}
