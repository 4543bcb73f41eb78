//! Bearer-token authentication and the admin authorization gate.
//!
//! Every request re-resolves its principal; nothing about the admin decision
//! outlives the request.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
    pub iat: usize,
    /// Admin flag at issue time; trusted for `claim_ttl_secs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

pub fn generate_token(user_id: &str, is_admin: bool, auth_config: &AuthConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(chrono::Duration::hours(auth_config.token_expiry_hours as i64))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to calculate expiration")))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
        iat: now.timestamp() as usize,
        is_admin: Some(is_admin),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth_config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.into()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::Unauthorized
    })
}

/// The embedded admin claim, if present and young enough to trust
fn fresh_admin_claim(claims: &Claims, now: i64, ttl_secs: u64) -> Option<bool> {
    let age = now.saturating_sub(claims.iat as i64);
    match claims.is_admin {
        Some(is_admin) if age >= 0 && (age as u64) <= ttl_secs => Some(is_admin),
        _ => None,
    }
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub is_admin: bool,
}

/// Resolve a bearer token to a principal: fast path from the token's own
/// claim, otherwise the authoritative user row.
pub async fn resolve_principal(state: &AppState, token: &str) -> Result<Principal, AppError> {
    let claims = verify_token(token, &state.config.auth.jwt_secret)?;

    if let Some(is_admin) = fresh_admin_claim(&claims, Utc::now().timestamp(), state.config.auth.claim_ttl_secs) {
        return Ok(Principal {
            user_id: claims.sub,
            is_admin,
        });
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub)
        .await
        .map_err(|e| {
            tracing::warn!("Identity lookup failed for {}: {}", claims.sub, e);
            AppError::Unauthorized
        })?
        .ok_or(AppError::Unauthorized)?;

    Ok(Principal {
        user_id: user.id,
        is_admin: user.is_admin,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        resolve_principal(state, bearer.token()).await
    }
}

/// A principal that passed the admin gate
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_admin {
            tracing::info!("Non-admin {} denied", principal.user_id);
            return Err(AppError::access_denied());
        }
        Ok(AdminPrincipal(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            token_expiry_hours: 1,
            claim_ttl_secs: 60,
        }
    }

    #[test]
    fn test_token_round_trip_carries_admin_claim() {
        let config = auth_config();
        let token = generate_token("user-1", true, &config).unwrap();
        let claims = verify_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.is_admin, Some(true));
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = generate_token("user-1", false, &auth_config()).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(verify_token("garbage", "test-secret"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_admin_claim_freshness() {
        let now = Utc::now().timestamp();
        let claims = |iat: i64, is_admin: Option<bool>| Claims {
            sub: "u".into(),
            exp: (now + 3600) as usize,
            iat: iat as usize,
            is_admin,
        };

        assert_eq!(fresh_admin_claim(&claims(now - 10, Some(true)), now, 60), Some(true));
        assert_eq!(fresh_admin_claim(&claims(now - 10, Some(false)), now, 60), Some(false));
        assert_eq!(fresh_admin_claim(&claims(now - 61, Some(true)), now, 60), None);
        assert_eq!(fresh_admin_claim(&claims(now, None), now, 60), None);
        assert_eq!(fresh_admin_claim(&claims(now - 5, Some(true)), now, 0), None);
    }
}
