use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info};
use uuid::Uuid;

use crate::{auth::repo_types::User, error::AppError, state::AppState};

const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx"];

/// Resume file as received from the multipart request.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub original_name: String,
    pub body: Bytes,
}

/// One application attempt. Preconditions run strictly in order and the
/// first failing check short-circuits. The file is stored before the
/// applicant record is appended, so a storage failure never leaves an
/// applicant entry behind (a crash in between can leak a file, which is
/// accepted).
pub async fn apply_to_job(
    state: &AppState,
    user: &User,
    job_id: Uuid,
    upload: Option<ResumeUpload>,
) -> Result<String, AppError> {
    let job = state
        .jobs
        .find_by_id(job_id)
        .await?
        .ok_or(AppError::NotFound("Job not found"))?;

    if job.last_date < OffsetDateTime::now_utc() {
        return Err(AppError::ApplicationClosed);
    }

    let upload = upload.ok_or(AppError::MissingFile)?;

    let ext = file_extension(&upload.original_name).ok_or(AppError::UnsupportedFileType)?;
    if !ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
    {
        return Err(AppError::UnsupportedFileType);
    }

    if upload.body.len() as u64 > state.config.upload.max_file_size {
        return Err(AppError::FileTooLarge);
    }

    let applicants = state.jobs.applicants(job_id).await?;
    if applicants.iter().any(|a| a.user_id == user.id) {
        return Err(AppError::DuplicateApplication);
    }

    let filename = resume_filename(&user.name, job_id, &ext);

    if let Err(e) = state.storage.put(&filename, upload.body).await {
        error!(error = %e, job_id = %job_id, user_id = %user.id, "resume write failed");
        return Err(AppError::StorageFailure);
    }

    // The store enforces at-most-one entry per (job, user); losing the race
    // against a concurrent identical application surfaces as a duplicate.
    if !state
        .jobs
        .append_applicant(job_id, user.id, &filename)
        .await?
    {
        return Err(AppError::DuplicateApplication);
    }

    info!(job_id = %job_id, user_id = %user.id, resume = %filename, "application recorded");
    Ok(filename)
}

fn file_extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Deterministic stored filename: `{sanitized name}_{job id}.{ext}`. Unique
/// per (applicant, job) pair and free of path-unsafe characters.
fn resume_filename(applicant_name: &str, job_id: Uuid, ext: &str) -> String {
    let safe: String = applicant_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{safe}_{job_id}.{ext}")
}
