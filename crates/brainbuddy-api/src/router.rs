use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::middleware::require_session;
use crate::{AppState, auth, contact, health, reports};

/// All routes, with state applied. `max_upload_bytes` caps every request
/// body; larger uploads are answered with 413.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let public_routes = Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .route("/api/health", get(health::health))
        .route("/ping", get(health::ping))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/api/contact", post(contact::submit));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route(
            "/api/reports",
            get(reports::list_reports).post(reports::upload_report),
        )
        .route(
            "/api/reports/{id}",
            get(reports::get_report).delete(reports::delete_report),
        )
        .route("/api/reports/{id}/download", get(reports::download_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
