use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{AppliedResponse, CreateJobRequest, DeletedResponse, JobResponse},
    repo_types::NewJob,
    services::{apply_to_job, ResumeUpload},
};
use crate::{
    auth::{
        extractors::{require_role, CurrentUser},
        repo_types::Role,
    },
    error::AppError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:id", delete(delete_job))
        .route("/jobs/:id/apply", put(apply))
        // A little headroom over the resume cap for multipart framing.
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
}

#[instrument(skip(state, payload))]
pub async fn create_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateJobRequest>,
) -> Result<Json<JobResponse>, AppError> {
    require_role(&user, &[Role::Employer, Role::Admin])?;

    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Please enter a job title".into()));
    }

    let job = state
        .jobs
        .create(NewJob {
            user_id: user.id,
            title: payload.title.trim().to_string(),
            description: payload.description,
            last_date: payload.last_date,
        })
        .await?;

    info!(job_id = %job.id, user_id = %user.id, "job created");
    Ok(Json(JobResponse {
        success: true,
        message: "Job created".into(),
        data: job,
    }))
}

#[instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    require_role(&user, &[Role::Employer, Role::Admin])?;

    let job = state
        .jobs
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Job not found"))?;

    if job.user_id != user.id && user.role != Role::Admin {
        return Err(AppError::Validation(format!(
            "User({}) is not allowed to delete this job",
            user.id
        )));
    }

    // Clean up stored resumes first; a missing file is not worth failing the
    // whole delete over.
    for applicant in state.jobs.applicants(id).await? {
        if let Err(e) = state.storage.delete(&applicant.resume).await {
            warn!(error = %e, resume = %applicant.resume, "resume cleanup failed");
        }
    }

    state.jobs.delete(id).await?;
    info!(job_id = %id, user_id = %user.id, "job deleted");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Job is deleted".into(),
    }))
}

#[instrument(skip(state, multipart))]
pub async fn apply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<AppliedResponse>, AppError> {
    require_role(&user, &[Role::User])?;

    let mut upload: Option<ResumeUpload> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Invalid multipart payload".into()))?
    {
        let Some(original_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let body: Bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::Validation("Invalid multipart payload".into()))?;
        upload = Some(ResumeUpload {
            original_name,
            body,
        });
        break;
    }

    let filename = apply_to_job(&state, &user, id, upload).await?;
    Ok(Json(AppliedResponse {
        success: true,
        message: "File uploaded successfully".into(),
        data: filename,
    }))
}
