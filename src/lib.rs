//! User-record management: a thin service over a pluggable user store.

#![forbid(unsafe_code)]
pub mod config;
pub mod database;
pub mod error;
pub mod telemetry;
pub mod user;

use std::sync::Arc;

use config::{Configuration, StoreKind};
use user::{MemoryUserStore, PgUserStore, UserService, UserStore};

/// State shared by every consumer of the process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub users: UserService,
}

/// Build the user store selected by `config`.
pub async fn store(
    config: &Configuration,
) -> Result<Arc<dyn UserStore>, Box<dyn std::error::Error>> {
    Ok(match config.store {
        StoreKind::Memory => {
            tracing::warn!("users are kept in memory and lost on exit");
            Arc::new(MemoryUserStore::new())
        },
        StoreKind::Postgres => {
            let Some(postgres) = &config.postgres else {
                return Err("missing `postgres` entry on `config.yaml` file".into());
            };
            let db = database::Database::from_config(postgres).await?;
            Arc::new(PgUserStore::new(db.postgres))
        },
    })
}

/// Initialize the application state.
///
/// Called once at startup; the single [`UserService`] it holds is then
/// passed to consumers.
pub async fn initialize_state(
    config: Arc<Configuration>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let users = UserService::new(store(&config).await?);

    Ok(AppState { config, users })
}
