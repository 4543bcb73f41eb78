use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use shared::{CatalogResponse, CategoryInfo, TaxonomyForm, ThemeInfo};
use uuid::Uuid;

use crate::{
    auth::AdminPrincipal,
    catalog::{slugify, TaxonomyDraft},
    error::{is_unique_violation, AppError, Result},
    state::AppState,
};

fn slug_conflict(e: sqlx::Error, kind: &str, slug: &str) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(format!("a {} with slug {} already exists", kind, slug))
    } else {
        e.into()
    }
}

pub async fn catalog(State(state): State<AppState>) -> Result<Json<CatalogResponse>> {
    let (categories, themes) = tokio::try_join!(state.db.list_categories(), state.db.list_themes())?;

    Ok(Json(CatalogResponse {
        categories: categories.into_iter().map(CategoryInfo::from).collect(),
        themes: themes.into_iter().map(ThemeInfo::from).collect(),
    }))
}

// ============================================================================
// Categories
// ============================================================================

pub async fn create_category(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Json(form): Json<TaxonomyForm>,
) -> Result<(StatusCode, Json<CategoryInfo>)> {
    let draft = TaxonomyDraft::from_form(form)?;
    let id = Uuid::new_v4().to_string();
    let slug = slugify(&draft.name);

    state
        .db
        .insert_category(&id, &slug, &draft)
        .await
        .map_err(|e| slug_conflict(e, "category", &slug))?;
    tracing::info!("Admin {} created category {}", admin.user_id, slug);

    let category = state
        .db
        .get_category(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("category {}", id)))?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

pub async fn update_category(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<TaxonomyForm>,
) -> Result<Json<CategoryInfo>> {
    let draft = TaxonomyDraft::from_form(form)?;
    if !state.db.update_category(&id, &draft).await? {
        return Err(AppError::not_found(format!("category {}", id)));
    }
    tracing::info!("Admin {} updated category {}", admin.user_id, id);

    let category = state
        .db
        .get_category(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("category {}", id)))?;
    Ok(Json(category.into()))
}

/// Sessions in the category keep existing, uncategorized
pub async fn delete_category(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    if !state.db.delete_category(&id).await? {
        return Err(AppError::not_found(format!("category {}", id)));
    }
    tracing::info!("Admin {} deleted category {}", admin.user_id, id);
    Ok(Json(json!({ "success": true })))
}

// ============================================================================
// Themes
// ============================================================================

pub async fn create_theme(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Json(form): Json<TaxonomyForm>,
) -> Result<(StatusCode, Json<ThemeInfo>)> {
    let draft = TaxonomyDraft::from_form(form)?;
    let id = Uuid::new_v4().to_string();
    let slug = slugify(&draft.name);

    state
        .db
        .insert_theme(&id, &slug, &draft)
        .await
        .map_err(|e| slug_conflict(e, "theme", &slug))?;
    tracing::info!("Admin {} created theme {}", admin.user_id, slug);

    let theme = state
        .db
        .get_theme(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("theme {}", id)))?;
    Ok((StatusCode::CREATED, Json(theme.into())))
}

pub async fn update_theme(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<TaxonomyForm>,
) -> Result<Json<ThemeInfo>> {
    let draft = TaxonomyDraft::from_form(form)?;
    if !state.db.update_theme(&id, &draft).await? {
        return Err(AppError::not_found(format!("theme {}", id)));
    }
    tracing::info!("Admin {} updated theme {}", admin.user_id, id);

    let theme = state
        .db
        .get_theme(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("theme {}", id)))?;
    Ok(Json(theme.into()))
}

pub async fn delete_theme(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    if !state.db.delete_theme(&id).await? {
        return Err(AppError::not_found(format!("theme {}", id)));
    }
    tracing::info!("Admin {} deleted theme {}", admin.user_id, id);
    Ok(Json(json!({ "success": true })))
}
