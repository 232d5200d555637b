use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;

use crate::{
    auth::repo::{PgUserStore, UserStore},
    config::AppConfig,
    email::{LogMailer, Mailer, SmtpMailer},
    jobs::repo::{JobStore, PgJobStore},
    storage::{LocalResumeStore, ResumeStore},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub jobs: Arc<dyn JobStore>,
    pub storage: Arc<dyn ResumeStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            warn!(error = %e, "migration failed; continuing");
        }

        let mailer: Arc<dyn Mailer> = if config.smtp.host.is_some() {
            Arc::new(SmtpMailer::new(&config.smtp)?)
        } else {
            warn!("SMTP_HOST not set; falling back to log-only mailer");
            Arc::new(LogMailer)
        };

        let storage = Arc::new(LocalResumeStore::new(&config.upload.dir)?);

        Ok(Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            jobs: Arc::new(PgJobStore::new(pool)),
            storage,
            mailer,
            config,
        })
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        jobs: Arc<dyn JobStore>,
        storage: Arc<dyn ResumeStore>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            jobs,
            storage,
            mailer,
            config,
        }
    }

    /// Fully in-memory state for unit tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        use testing::*;
        Self::from_parts(
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryJobStore::default()),
            Arc::new(MemoryResumeStore::default()),
            Arc::new(RecordingMailer::default()),
            Arc::new(test_config()),
        )
    }
}
