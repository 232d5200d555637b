use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Job posting. Owned by the employer identified by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    /// Application deadline, enforced strictly.
    pub last_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// One entry in a job's applicant list.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Applicant {
    pub user_id: Uuid,
    pub resume: String,
    pub applied_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub last_date: OffsetDateTime,
}
