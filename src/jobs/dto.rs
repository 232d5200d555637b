use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::Job;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_date: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub message: String,
    pub data: Job,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AppliedResponse {
    pub success: bool,
    pub message: String,
    /// Stored resume filename.
    pub data: String,
}
