use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use super::{jwt::JwtKeys, password::hash_password, repo_types::User};
use crate::{
    email::Email,
    error::AppError,
    state::AppState,
};

/// 32 random bytes, URL-safe encoded. Disclosed to the user exactly once in
/// the reset link; only its hash is ever persisted.
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn hash_secret(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Start a pending reset for the account behind `email`. A reset already
/// pending is overwritten (last request wins), which silently invalidates the
/// earlier link.
pub async fn request_reset(state: &AppState, email: &str) -> Result<(), AppError> {
    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or(AppError::NotFound("No user found with this email"))?;

    let secret = generate_secret();
    let token_hash = hash_secret(&secret);
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.reset.ttl_minutes);

    state
        .users
        .set_reset_token(user.id, &token_hash, expires_at)
        .await?;

    let link = format!(
        "{}/{}",
        state.config.reset.url_base.trim_end_matches('/'),
        secret
    );
    let mail = Email {
        to: user.email.clone(),
        subject: "Password Reset".into(),
        body: format!(
            "Your password reset link is as follows:\n\n{link}\n\n\
             If you have not requested this email, please ignore it."
        ),
    };

    if let Err(e) = state.mailer.send(mail).await {
        // Never leave a redeemable secret behind if the user never got it.
        warn!(error = %e, user_id = %user.id, "reset email failed; clearing pending reset");
        state.users.clear_reset_token(user.id).await?;
        return Err(AppError::EmailDeliveryFailed);
    }

    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

/// Redeem a raw secret from the reset link. Missing and expired tokens are
/// indistinguishable to the caller. On success the password is rotated, the
/// pending reset is cleared and a fresh auth token is issued.
pub async fn redeem_reset(
    state: &AppState,
    raw_token: &str,
    new_password: &str,
) -> Result<(String, User), AppError> {
    if new_password.len() < 8 {
        return Err(AppError::Validation("Password too short".into()));
    }

    let token_hash = hash_secret(raw_token);
    let user = state
        .users
        .find_by_reset_hash(&token_hash)
        .await?
        .ok_or(AppError::InvalidOrExpiredResetToken)?;

    match user.reset_expires_at {
        Some(expires_at) if expires_at > OffsetDateTime::now_utc() => {}
        _ => return Err(AppError::InvalidOrExpiredResetToken),
    }

    let password_hash = hash_password(new_password)?;
    state.users.update_password(user.id, &password_hash).await?;
    state.users.clear_reset_token(user.id).await?;

    let token = JwtKeys::new(&state.config.jwt).issue(user.id)?;
    info!(user_id = %user.id, "password reset completed");
    Ok((token, user))
}
