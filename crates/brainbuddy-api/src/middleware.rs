use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::ApiError;
use crate::session;

/// Resolve the session cookie and attach a [`session::CurrentSession`] to
/// the request, or reject with 401.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current = session::resolve(&state, &jar)
        .await?
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}
