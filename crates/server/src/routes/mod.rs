use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::StorageBackend;
use crate::state::AppState;

mod auth;
mod favorites;
mod health;
mod sessions;
mod taxonomy;
mod uploads;
mod users;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/claim-admin", post(auth::claim_admin))
        // Public catalog
        .route("/catalog", get(taxonomy::catalog))
        .route("/sessions", get(sessions::list_videos))
        .route("/sessions/schedule", get(sessions::schedule))
        .route("/sessions/:slug", get(sessions::get_by_slug))
        // Favorites
        .route("/favorites", get(favorites::list))
        .route("/favorites/:session_id/toggle", post(favorites::toggle))
        // Admin: sessions
        .route("/admin/sessions", get(sessions::admin_list).post(sessions::create))
        .route("/admin/sessions/:id", put(sessions::update).delete(sessions::delete))
        .route("/admin/sessions/:id/go-live", post(sessions::go_live))
        .route("/admin/sessions/:id/end-stream", post(sessions::end_stream))
        // Admin: taxonomy
        .route("/admin/categories", post(taxonomy::create_category))
        .route(
            "/admin/categories/:id",
            put(taxonomy::update_category).delete(taxonomy::delete_category),
        )
        .route("/admin/themes", post(taxonomy::create_theme))
        .route(
            "/admin/themes/:id",
            put(taxonomy::update_theme).delete(taxonomy::delete_theme),
        )
        // Admin: users
        .route("/admin/users", get(users::list))
        .route("/admin/users/:id/admin", put(users::set_admin))
        // Admin: media. Size ceilings are enforced per kind while streaming.
        .route(
            "/admin/uploads/thumbnail",
            post(uploads::thumbnail).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/admin/uploads/video",
            post(uploads::video).layer(DefaultBodyLimit::disable()),
        )
        .route("/admin/media/:slug", delete(uploads::delete_folder));

    if state.config.storage.backend == StorageBackend::Local {
        router = router.nest_service("/media", ServeDir::new(&state.config.storage.root));
    }

    router
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
