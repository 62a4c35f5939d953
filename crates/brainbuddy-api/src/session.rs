use anyhow::anyhow;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use brainbuddy_db::models::UserRow;

use crate::error::ApiError;
use crate::{AppState, run_db};

pub const SESSION_COOKIE: &str = "brainbuddy_session";

/// 256-bit session tokens.
const TOKEN_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// How sessions are keyed and how their cookie is shaped.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC key for token hashes. Only hashes are stored, so a leaked
    /// sessions table does not yield usable cookies.
    pub secret_key: String,
    pub lifetime: chrono::Duration,
    pub secure_cookie: bool,
}

/// The session attached to a request by [`crate::middleware::require_session`].
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token_hash: String,
    pub user: UserRow,
}

impl SessionConfig {
    pub fn hash_token(&self, token: &str) -> anyhow::Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| anyhow!("Invalid session key: {}", e))?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Persistent sessions survive a browser restart (`Max-Age`); the
    /// others are dropped with the browser session. Both expire server-side
    /// after `lifetime`.
    fn session_cookie(&self, token: String, persistent: bool) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure_cookie);
        if persistent {
            cookie = cookie.max_age(time::Duration::seconds(self.lifetime.num_seconds()));
        }
        cookie.build()
    }
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Start a session for `user_id` and attach its cookie to `jar`.
pub async fn establish(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
    persistent: bool,
) -> Result<CookieJar, ApiError> {
    let token = generate_token();
    let token_hash = state.sessions.hash_token(&token)?;
    let lifetime_secs = state.sessions.lifetime.num_seconds();

    run_db(state, move |db| {
        db.create_session(&token_hash, user_id, lifetime_secs)
    })
    .await?;

    Ok(jar.add(state.sessions.session_cookie(token, persistent)))
}

/// Look up the session named by the request's cookie. Missing, unknown and
/// expired cookies all resolve to `None`.
pub async fn resolve(state: &AppState, jar: &CookieJar) -> Result<Option<CurrentSession>, ApiError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let token_hash = state.sessions.hash_token(cookie.value())?;
    let lookup = token_hash.clone();
    let user = run_db(state, move |db| db.get_session_user(&lookup)).await?;

    Ok(user.map(|user| CurrentSession { token_hash, user }))
}

/// Delete the session server-side and expire the cookie.
pub async fn revoke(state: &AppState, jar: CookieJar, token_hash: String) -> Result<CookieJar, ApiError> {
    run_db(state, move |db| db.delete_session(&token_hash)).await?;
    Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
}
