use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::repo_types::Role;

/// Every failure a handler can produce. The `IntoResponse` impl below is the
/// single place where internal failure kinds become HTTP statuses and
/// client-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("Role({0}) is not allowed to access this resource")]
    Forbidden(Role),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("You can no longer apply to this job")]
    ApplicationClosed,

    #[error("Please upload a resume file")]
    MissingFile,

    #[error("Resume must be a .pdf or .docx file")]
    UnsupportedFileType,

    #[error("Resume exceeds the maximum allowed file size")]
    FileTooLarge,

    #[error("You have already applied to this job")]
    DuplicateApplication,

    #[error("Password reset token is invalid or has expired")]
    InvalidOrExpiredResetToken,

    #[error("Reset email could not be sent")]
    EmailDeliveryFailed,

    #[error("Resume upload failed")]
    StorageFailure,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_)
            | Self::ApplicationClosed
            | Self::MissingFile
            | Self::UnsupportedFileType
            | Self::FileTooLarge
            | Self::DuplicateApplication
            | Self::InvalidOrExpiredResetToken => StatusCode::BAD_REQUEST,
            Self::EmailDeliveryFailed
            | Self::StorageFailure
            | Self::Database(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, detail) = match &self {
            Self::Database(e) => {
                error!(error = ?e, "database error");
                ("Internal server error".to_string(), Some(e.to_string()))
            }
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                ("Internal server error".to_string(), Some(format!("{e:#}")))
            }
            other => (other.to_string(), None),
        };

        // Raw internals are only exposed on debug builds; production clients
        // get status + sanitized message.
        let detail = if cfg!(debug_assertions) { detail } else { None };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
                detail,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            AppError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden(Role::User).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Job not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ApplicationClosed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicateApplication.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InvalidOrExpiredResetToken.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::StorageFailure.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::EmailDeliveryFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn forbidden_message_names_the_role() {
        let msg = AppError::Forbidden(Role::Employer).to_string();
        assert!(msg.contains("employer"), "got: {msg}");
    }
}
