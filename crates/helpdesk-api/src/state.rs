use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use helpdesk_db::Database;

use crate::error::ApiError;
use crate::triage::TriageClassifier;
use crate::workflow::WorkflowNotifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session: SessionSettings,
    pub classifier: Arc<dyn TriageClassifier>,
    pub workflow: Arc<dyn WorkflowNotifier>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub jwt_secret: String,
    pub ttl: chrono::Duration,
    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub cookie_secure: bool,
}

impl SessionSettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            ttl: chrono::Duration::hours(24),
            cookie_secure: false,
        }
    }
}

/// Runs CPU-heavy or blocking work (SQLite, Argon2) off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("blocking task failed"))
    })?
}

/// Runs a query against the shared database on the blocking pool.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    run_blocking(move || f(&state.db).map_err(ApiError::Internal)).await
}
