pub mod auth;
pub mod contact;
pub mod error;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod password;
pub mod reports;
pub mod router;
pub mod session;
pub mod storage;

use std::sync::Arc;

use brainbuddy_db::Database;

use crate::error::ApiError;
use crate::session::SessionConfig;
use crate::storage::Storage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub sessions: SessionConfig,
}

/// Run a blocking DB call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(ApiError::from)
}
