use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::admins::repo::{AdminRepo, PgAdminRepo};
use crate::config::AppConfig;
use crate::identity::{GoTrueClient, IdentityProvider};
use crate::roles::repo::{PgRoleRepo, RoleRepo};
use crate::users::repo::{PgProfileRepo, ProfileRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub admins: Arc<dyn AdminRepo>,
    pub roles: Arc<dyn RoleRepo>,
    pub profiles: Arc<dyn ProfileRepo>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let timeout = config.upstream_timeout;

        let db = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(timeout)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing with existing schema");
        }

        let identity = Arc::new(GoTrueClient::new(&config.identity, timeout)?)
            as Arc<dyn IdentityProvider>;

        Ok(Self {
            admins: Arc::new(PgAdminRepo::new(db.clone(), timeout)),
            roles: Arc::new(PgRoleRepo::new(db.clone(), timeout)),
            profiles: Arc::new(PgProfileRepo::new(db, timeout)),
            identity,
            config,
        })
    }
}
