use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{
    jwt::JwtKeys,
    repo_types::{Role, User},
};
use crate::{error::AppError, state::AppState};

/// Authentication gate. Extracts the bearer token, verifies it and resolves
/// the subject user. Every failure mode collapses to a generic 401 at the
/// wire; the distinction between invalid and expired is kept in the logs.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthenticated("Login first to access this resource".into())
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthenticated("Login first to access this resource".into())
        })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token verification failed");
            AppError::Unauthenticated("Invalid or expired token".into())
        })?;

        // A token for a deleted account is not auto-healed.
        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid or expired token".into()))?;

        Ok(CurrentUser(user))
    }
}

/// Authorization gate, sequenced explicitly after [`CurrentUser`] inside
/// handlers.
pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(user.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{password::hash_password, repo_types::NewUser};
    use axum::http::Request;
    use uuid::Uuid;

    fn parts_with_auth(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header("Authorization", h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn seed_user(state: &AppState, role: Role) -> User {
        state
            .users
            .create(NewUser {
                name: "Alice Doe".into(),
                email: format!("{}@x.com", Uuid::new_v4()),
                password_hash: hash_password("password123").unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn resolves_user_from_valid_bearer_token() {
        let state = AppState::fake();
        let user = seed_user(&state, Role::User).await;
        let token = JwtKeys::from_ref(&state).issue(user.id).unwrap();

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let CurrentUser(resolved) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .expect("should authenticate");
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn rejects_non_bearer_scheme() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer not-a-jwt"));
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn rejects_token_for_deleted_account() {
        let state = AppState::fake();
        // Valid token whose subject was never stored.
        let token = JwtKeys::from_ref(&state).issue(Uuid::new_v4()).unwrap();
        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn role_guard_matrix() {
        let state = AppState::fake();
        let roles = [Role::User, Role::Employer, Role::Admin];
        for role in roles {
            let user = seed_user(&state, role).await;
            for allowed in roles {
                let result = require_role(&user, &[allowed]);
                if role == allowed {
                    assert!(result.is_ok());
                } else {
                    match result.unwrap_err() {
                        AppError::Forbidden(rejected) => assert_eq!(rejected, role),
                        other => panic!("expected Forbidden, got {other:?}"),
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn role_guard_accepts_any_of_multiple_roles() {
        let state = AppState::fake();
        let employer = seed_user(&state, Role::Employer).await;
        let admin = seed_user(&state, Role::Admin).await;
        let user = seed_user(&state, Role::User).await;
        let allowed = [Role::Employer, Role::Admin];
        assert!(require_role(&employer, &allowed).is_ok());
        assert!(require_role(&admin, &allowed).is_ok());
        assert!(require_role(&user, &allowed).is_err());
    }
}
