use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Applicant, Job, NewJob};

/// Narrow persistence interface for job postings and their applicant lists.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, new: NewJob) -> anyhow::Result<Job>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Job>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    async fn applicants(&self, job_id: Uuid) -> anyhow::Result<Vec<Applicant>>;

    /// Atomically append to the applicant list. Returns `false` when the
    /// user is already present, so two concurrent applications from the same
    /// user can never both be recorded.
    async fn append_applicant(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        resume: &str,
    ) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, new: NewJob) -> anyhow::Result<Job> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (user_id, title, description, last_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, last_date, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.last_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, user_id, title, description, last_date, created_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn applicants(&self, job_id: Uuid) -> anyhow::Result<Vec<Applicant>> {
        let rows = sqlx::query_as::<_, Applicant>(
            r#"
            SELECT user_id, resume, applied_at
            FROM job_applicants
            WHERE job_id = $1
            ORDER BY applied_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn append_applicant(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        resume: &str,
    ) -> anyhow::Result<bool> {
        // The UNIQUE (job_id, user_id) constraint makes this race-free.
        let result = sqlx::query(
            r#"
            INSERT INTO job_applicants (job_id, user_id, resume)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id, user_id) DO NOTHING
            "#,
        )
        .bind(job_id)
        .bind(user_id)
        .bind(resume)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
