use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use crates::{
    domain::repositories::login_codes::{LoginCodeEntry, LoginCodeRepository},
    notifications::Mailer,
    security::{sanitizer::clean_input, tokens},
};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum LoginCodeError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Code expired or not found")]
    ExpiredOrMissing,
    #[error("Invalid code")]
    InvalidCode,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LoginCodeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LoginCodeError::MissingEmail
            | LoginCodeError::ExpiredOrMissing
            | LoginCodeError::InvalidCode => StatusCode::BAD_REQUEST,
            LoginCodeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type LoginCodeResult<T> = std::result::Result<T, LoginCodeError>;

/// Email sign-in with short-lived numeric codes, independent of any payment.
pub struct LoginCodeUseCase<R, M>
where
    R: LoginCodeRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    login_code_repo: Arc<R>,
    mailer: Arc<M>,
    code_ttl: Duration,
    code_length: usize,
}

impl<R, M> LoginCodeUseCase<R, M>
where
    R: LoginCodeRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    pub fn new(login_code_repo: Arc<R>, mailer: Arc<M>, code_ttl: Duration, code_length: usize) -> Self {
        Self {
            login_code_repo,
            mailer,
            code_ttl,
            code_length,
        }
    }

    pub async fn send_code(&self, raw_email: &str) -> LoginCodeResult<()> {
        let email = normalize_email(raw_email)?;
        let code = tokens::generate_otp(self.code_length);

        self.login_code_repo
            .put_code(
                &email,
                LoginCodeEntry {
                    code: code.clone(),
                    expires_at: Utc::now() + self.code_ttl,
                },
            )
            .await
            .map_err(|err| {
                error!(%email, db_error = ?err, "login_codes: failed to store code");
                LoginCodeError::Internal(err)
            })?;

        if let Err(err) = self.mailer.send_otp(&email, &code).await {
            warn!(%email, error = %err, "login_codes: failed to send code");
        }

        info!(%email, "login_codes: code issued");
        Ok(())
    }

    /// Returns the verified email. A code is single use, and an expired one is
    /// evicted when it is looked up.
    pub async fn verify_code(&self, raw_email: &str, code: &str) -> LoginCodeResult<String> {
        let email = normalize_email(raw_email)?;

        let entry = self
            .login_code_repo
            .find_code(&email)
            .await
            .map_err(LoginCodeError::Internal)?;

        let Some(entry) = entry else {
            return Err(LoginCodeError::ExpiredOrMissing);
        };

        if Utc::now() > entry.expires_at {
            self.evict(&email).await?;
            warn!(%email, "login_codes: code expired");
            return Err(LoginCodeError::ExpiredOrMissing);
        }

        if entry.code != code.trim() {
            warn!(%email, "login_codes: invalid code");
            return Err(LoginCodeError::InvalidCode);
        }

        self.evict(&email).await?;
        info!(%email, "login_codes: email verified");
        Ok(email)
    }

    async fn evict(&self, email: &str) -> LoginCodeResult<()> {
        self.login_code_repo
            .evict_code(email)
            .await
            .map_err(|err| {
                error!(%email, db_error = ?err, "login_codes: failed to evict code");
                LoginCodeError::Internal(err)
            })
    }
}

fn normalize_email(raw: &str) -> LoginCodeResult<String> {
    let email = clean_input(raw).to_lowercase();
    if email.is_empty() {
        return Err(LoginCodeError::MissingEmail);
    }
    Ok(email)
}
