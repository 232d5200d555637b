use axum::{
    extract::{FromRef, Path, State},
    http::{header::SET_COOKIE, HeaderMap},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
        RegisterRequest, ResetPasswordRequest,
    },
    extractors::CurrentUser,
    jwt::JwtKeys,
    password::{hash_password, is_valid_email, verify_password},
    repo_types::{NewUser, User},
    reset,
};
use crate::{error::AppError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/:token", put(reset_password))
        .route("/me", get(me))
}

/// `Set-Cookie` value mirroring the token's lifetime.
fn auth_cookie_headers(token: &str, ttl_minutes: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let cookie = format!(
        "token={token}; Max-Age={}; Path=/; HttpOnly",
        ttl_minutes.max(0) * 60
    );
    if let Ok(value) = cookie.parse() {
        headers.insert(SET_COOKIE, value);
    }
    headers
}

fn auth_response(
    state: &AppState,
    user: &User,
    token: String,
) -> (HeaderMap, Json<AuthResponse>) {
    let headers = auth_cookie_headers(&token, state.config.jwt.ttl_minutes);
    (
        headers,
        Json(AuthResponse {
            success: true,
            token,
            user: PublicUser::from(user),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Please enter your name".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::Validation("Password too short".into()));
    }

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Validation("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            name: payload.name.trim().to_string(),
            email: payload.email,
            password_hash: hash,
            role: payload.role.unwrap_or_default(),
        })
        .await?;

    let token = JwtKeys::from_ref(&state).issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(auth_response(&state, &user, token))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Please enter email & password".into()));
    }

    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid email or password".into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated("Invalid email or password".into()));
    }

    let token = JwtKeys::from_ref(&state).issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(auth_response(&state, &user, token))
}

#[instrument(skip_all)]
pub async fn logout(
    CurrentUser(user): CurrentUser,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    let mut headers = HeaderMap::new();
    // Overwrite the cookie with a sentinel and an already-past expiry.
    if let Ok(value) =
        "token=none; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; HttpOnly".parse()
    {
        headers.insert(SET_COOKIE, value);
    }
    info!(user_id = %user.id, "user logged out");
    Ok((
        headers,
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    reset::request_reset(&state, payload.email.trim()).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Email sent successfully".into(),
    }))
}

#[instrument(skip(state, payload, token))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let (jwt, user) = reset::redeem_reset(&state, &token, &payload.password).await?;
    Ok(auth_response(&state, &user, jwt))
}

#[instrument(skip_all)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;

    fn register_req(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    #[tokio::test]
    async fn register_sets_cookie_and_returns_token() {
        let state = AppState::fake();
        let (headers, Json(body)) = register(
            State(state),
            Json(register_req("Alice", "alice@x.com", "password123")),
        )
        .await
        .expect("register");

        assert!(body.success);
        assert!(!body.token.is_empty());
        assert_eq!(body.user.email, "alice@x.com");
        assert_eq!(body.user.role, Role::User);

        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("token={}", body.token)));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let state = AppState::fake();
        register(
            State(state.clone()),
            Json(register_req("Alice", "alice@x.com", "password123")),
        )
        .await
        .unwrap();

        let err = register(
            State(state),
            Json(register_req("Other Alice", "alice@x.com", "password123")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let state = AppState::fake();
        for (name, email, password) in [
            ("", "alice@x.com", "password123"),
            ("Alice", "not-an-email", "password123"),
            ("Alice", "alice@x.com", "short"),
        ] {
            let err = register(State(state.clone()), Json(register_req(name, email, password)))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn login_roundtrip_and_wrong_password() {
        let state = AppState::fake();
        register(
            State(state.clone()),
            Json(register_req("Alice", "alice@x.com", "password123")),
        )
        .await
        .unwrap();

        let (_, Json(body)) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "Alice@X.com ".trim().into(),
                password: "password123".into(),
            }),
        )
        .await
        .expect("login");
        assert!(!body.token.is_empty());

        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "alice@x.com".into(),
                password: "wrong-password".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        // Unknown account gets the same generic answer.
        let err = login(
            State(state),
            Json(LoginRequest {
                email: "ghost@x.com".into(),
                password: "password123".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn logout_overwrites_cookie() {
        let state = AppState::fake();
        let (_, Json(body)) = register(
            State(state.clone()),
            Json(register_req("Alice", "alice@x.com", "password123")),
        )
        .await
        .unwrap();
        let user = state
            .users
            .find_by_id(body.user.id)
            .await
            .unwrap()
            .unwrap();

        let (headers, Json(msg)) = logout(CurrentUser(user)).await.unwrap();
        assert!(msg.success);
        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token=none"));
        assert!(cookie.contains("1970"));
    }
}
