use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;
use validator::ValidateEmail;

use brainbuddy_types::api::{
    AuthResponse, LoginRequest, MeResponse, MessageResponse, RegisterRequest,
};

use crate::error::ApiError;
use crate::extract::{JsonOrForm, trimmed};
use crate::password::{hash_password, verify_password};
use crate::session::{self, CurrentSession};
use crate::{AppState, run_db};

/// POST /auth/register: create the account and sign it in for this
/// browser session.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonOrForm(req): JsonOrForm<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let name = trimmed(req.name);
    let email = trimmed(req.email).to_lowercase();
    let password = trimmed(req.password);

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("name, email and password are required"));
    }
    if !email.validate_email() {
        return Err(ApiError::validation("Invalid email"));
    }

    let lookup = email.clone();
    if run_db(&state, move |db| db.get_user_by_email(&lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&password)?;

    // A concurrent registration can still win the race; the insert reports it.
    let user = run_db(&state, move |db| db.create_user(&name, &email, &password_hash))
        .await?
        .ok_or_else(|| ApiError::Conflict("Email already registered".into()))?;

    let jar = session::establish(&state, jar, user.id, false).await?;
    info!("Registered user {} ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "Registered successfully",
            user: user.to_public()?,
        }),
    ))
}

/// POST /auth/login: verify credentials and start a persistent session.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonOrForm(req): JsonOrForm<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let email = trimmed(req.email).to_lowercase();
    let password = trimmed(req.password);

    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let jar = session::establish(&state, jar, user.id, true).await?;
    info!("User {} logged in", user.id);

    Ok((
        jar,
        Json(AuthResponse {
            message: "Logged in",
            user: user.to_public()?,
        }),
    ))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let jar = session::revoke(&state, jar, current.token_hash).await?;
    info!("User {} logged out", current.user.id);

    Ok((jar, Json(MessageResponse { message: "Logged out" })))
}

/// GET /auth/me: never fails for lack of a session; `user` is null instead.
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<MeResponse>, ApiError> {
    let user = match session::resolve(&state, &jar).await? {
        Some(current) => Some(current.user.to_public()?),
        None => None,
    };

    Ok(Json(MeResponse { user }))
}
