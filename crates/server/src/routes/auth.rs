use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use chrono::Utc;
use shared::{AuthResponse, Credentials, PrincipalInfo};
use uuid::Uuid;

use crate::{
    auth::{generate_token, Principal},
    db::User,
    error::{is_unique_violation, AppError},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

fn validate_credentials(req: &Credentials) -> Result<String, AppError> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AppError::validation("a valid email address is required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(email)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = validate_credentials(&req)?;

    // Check if user already exists
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    // Hash password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash,
        is_admin: false,
        created_at: Utc::now(),
    };
    state.db.create_user(&user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            e.into()
        }
    })?;
    tracing::info!("Registered user {}", user.id);

    let token = generate_token(&user.id, false, &state.config.auth)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        is_admin: false,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized)?;

    let token = generate_token(&user.id, user.is_admin, &state.config.auth)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        is_admin: user.is_admin,
    }))
}

pub async fn me(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<PrincipalInfo>, AppError> {
    // The row, not the token claim, decides is_admin here
    let user = state
        .db
        .get_user_by_id(&principal.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(PrincipalInfo {
        user_id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    }))
}

/// Bootstrap: the first caller to claim becomes admin. Returns a fresh token
/// carrying the new claim.
pub async fn claim_admin(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<AuthResponse>, AppError> {
    if !state.db.claim_first_admin(&principal.user_id).await? {
        tracing::info!("Admin claim by {} refused", principal.user_id);
        return Err(AppError::Forbidden("An admin already exists".to_string()));
    }
    tracing::info!("User {} claimed admin", principal.user_id);

    let token = generate_token(&principal.user_id, true, &state.config.auth)?;
    Ok(Json(AuthResponse {
        token,
        user_id: principal.user_id,
        is_admin: true,
    }))
}
