//! HTTP client for the FlowState API.
//!
//! Every request carries a client-side timeout. A timed-out mutation may still
//! have been applied by the server, so it is reported as an unknown outcome
//! rather than a failure.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    AuthResponse, Credentials, ErrorBody, FavoriteToggleResponse, FavoritesResponse, PrincipalInfo,
    ScheduleResponse, SessionInfo, SetAdminRequest, UploadResponse, UserInfo, VideoSort,
};
use std::path::Path;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Uploads may carry up to 2 GiB, so they get their own ceiling
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no response within {0:?}; the outcome is unknown, check the current state before retrying")]
    Timeout(Duration),

    #[error("not signed in; run `flowstate login` first")]
    NotSignedIn,

    #[error("{message} ({status}, {code})")]
    Server {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("could not reach the server: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected response from the server: {0}")]
    Decode(String),

    #[error("could not read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Transport(e)
        }
    }

    /// Build an error from a non-2xx response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => ApiError::Server {
                status,
                code: parsed.error.code,
                message: parsed.error.message,
            },
            Err(_) => ApiError::Server {
                status,
                code: "HTTP_ERROR".to_string(),
                message: if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body.trim().to_string()
                },
            },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MediaKind {
    Thumbnail,
    Video,
}

impl MediaKind {
    fn endpoint(&self) -> &'static str {
        match self {
            MediaKind::Thumbnail => "/admin/uploads/thumbnail",
            MediaKind::Video => "/admin/uploads/video",
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: &str, token: Option<String>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authed(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ApiError::NotSignedIn)?;
        Ok(request.bearer_auth(token))
    }

    fn maybe_authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, timeout: Duration) -> ApiResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("{} -> {}: {}", self.base, status, body);
            return Err(ApiError::from_response(status, &body));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(timeout)
            } else {
                ApiError::Decode(e.to_string())
            }
        })
    }

    // ========================================================================
    // Auth
    // ========================================================================

    pub async fn register(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let request = self.http.post(self.url("/auth/register")).json(credentials);
        self.send(request, REQUEST_TIMEOUT).await
    }

    pub async fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let request = self.http.post(self.url("/auth/login")).json(credentials);
        self.send(request, REQUEST_TIMEOUT).await
    }

    pub async fn me(&self) -> ApiResult<PrincipalInfo> {
        let request = self.authed(self.http.get(self.url("/auth/me")))?;
        self.send(request, REQUEST_TIMEOUT).await
    }

    pub async fn claim_admin(&self) -> ApiResult<AuthResponse> {
        let request = self.authed(self.http.post(self.url("/auth/claim-admin")))?;
        self.send(request, REQUEST_TIMEOUT).await
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    pub async fn videos(&self, sort: VideoSort) -> ApiResult<Vec<SessionInfo>> {
        let request = self.http.get(self.url("/sessions")).query(&[("sort", sort)]);
        self.send(request, REQUEST_TIMEOUT).await
    }

    pub async fn schedule(&self) -> ApiResult<ScheduleResponse> {
        let request = self.http.get(self.url("/sessions/schedule"));
        self.send(request, REQUEST_TIMEOUT).await
    }

    pub async fn go_live(&self, session_id: &str) -> ApiResult<SessionInfo> {
        let path = format!("/admin/sessions/{}/go-live", session_id);
        let request = self.authed(self.http.post(self.url(&path)))?;
        self.send(request, REQUEST_TIMEOUT).await
    }

    pub async fn end_stream(&self, session_id: &str) -> ApiResult<SessionInfo> {
        let path = format!("/admin/sessions/{}/end-stream", session_id);
        let request = self.authed(self.http.post(self.url(&path)))?;
        self.send(request, REQUEST_TIMEOUT).await
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// Anonymous toggles are sent too; the server answers with a sign-in prompt
    pub async fn toggle_favorite(&self, session_id: &str) -> ApiResult<FavoriteToggleResponse> {
        let path = format!("/favorites/{}/toggle", session_id);
        let request = self.maybe_authed(self.http.post(self.url(&path)));
        self.send(request, REQUEST_TIMEOUT).await
    }

    pub async fn favorites(&self) -> ApiResult<FavoritesResponse> {
        let request = self.authed(self.http.get(self.url("/favorites")))?;
        self.send(request, REQUEST_TIMEOUT).await
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub async fn upload(&self, kind: MediaKind, slug: &str, file: &Path) -> ApiResult<UploadResponse> {
        let data = tokio::fs::read(file).await.map_err(|source| ApiError::File {
            path: file.display().to_string(),
            source,
        })?;
        let content_type = mime_guess::from_path(file).first_or_octet_stream().to_string();
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        tracing::debug!("Uploading {} ({}, {} bytes)", file_name, content_type, data.len());

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(&content_type)
            .map_err(|e| ApiError::from_reqwest(e, UPLOAD_TIMEOUT))?;
        let form = reqwest::multipart::Form::new()
            .text("slug", slug.to_string())
            .part("file", part);

        let request = self
            .authed(self.http.post(self.url(kind.endpoint())))?
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT);
        self.send(request, UPLOAD_TIMEOUT).await
    }

    pub async fn set_admin(&self, user_id: &str, is_admin: bool) -> ApiResult<UserInfo> {
        let path = format!("/admin/users/{}/admin", user_id);
        let request = self
            .authed(self.http.put(self.url(&path)))?
            .json(&SetAdminRequest { is_admin });
        self.send(request, REQUEST_TIMEOUT).await
    }
}
