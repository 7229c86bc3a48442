//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AuthConfig, SecurityConfig};
use crate::db::{Store, User};
use crate::services::auth_service::{
    AuthError, AuthService, AuthSession, RegisterRequest, UserInfo,
};
use crate::services::code_service::CodeService;
use crate::services::mailer::Mailer;
use crate::services::token::TokenService;

const MIN_PASSWORD_LENGTH: usize = 8;

fn to_user_info(user: User) -> UserInfo {
    UserInfo {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        created_at: user.created_at,
    }
}

/// Reset tokens are stored hashed; a database leak must not yield usable
/// tokens.
fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn generate_reset_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenService,
    codes: Arc<dyn CodeService>,
    mailer: Arc<dyn Mailer>,
    security: SecurityConfig,
    reset_token_expiry_minutes: i64,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        tokens: TokenService,
        codes: Arc<dyn CodeService>,
        mailer: Arc<dyn Mailer>,
        security: SecurityConfig,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            codes,
            mailer,
            security,
            reset_token_expiry_minutes: auth.reset_token_expiry_minutes,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, login: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self
            .store
            .user_repo()
            .verify_password(login, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self
            .tokens
            .issue(user.id, &user.username, &user.role)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(AuthSession {
            token,
            user: to_user_info(user),
        })
    }

    async fn register(&self, request: RegisterRequest) -> Result<UserInfo, AuthError> {
        if request.username.trim().is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }
        if !request.email.contains('@') {
            return Err(AuthError::Validation(
                "A valid email address is required".to_string(),
            ));
        }
        validate_password(&request.password)?;

        if self
            .store
            .user_repo()
            .username_or_email_taken(&request.username, &request.email)
            .await?
        {
            return Err(AuthError::Conflict("Username or email".to_string()));
        }

        // Validate first so bad codes never cost a password hash; the
        // transactional consume below re-checks under the write lock.
        let code = self.codes.validate(&request.invite_code).await?;

        let password = request.password.clone();
        let security = self.security.clone();
        let password_hash = tokio::task::spawn_blocking(move || {
            crate::db::repositories::user::hash_password(&password, Some(&security))
        })
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))??;

        match self
            .store
            .register_user_with_code(&request.username, &request.email, &password_hash, code.id)
            .await
        {
            Ok(user) => Ok(to_user_info(user)),
            Err(e) => {
                // The code raced to an unusable state between validate and
                // consume; re-derive the precise rejection.
                warn!("Registration consume failed for code {}: {}", code.id, e);
                match self.codes.validate(&request.invite_code).await {
                    Ok(_) => Err(AuthError::Internal(e.to_string())),
                    Err(code_err) => Err(code_err.into()),
                }
            }
        }
    }

    async fn get_user_info(&self, user_id: i32) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .user_repo()
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(to_user_info(user))
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let user = self
            .store
            .user_repo()
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let verified = self
            .store
            .user_repo()
            .verify_password(&user.username, current_password)
            .await?;

        if verified.is_none() {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store
            .user_repo()
            .update_password(user_id, new_password, Some(&self.security))
            .await?;

        info!("Password changed for user: {}", user.username);
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        // Same response shape whether or not the account exists.
        let Some(user) = self.store.user_repo().get_by_email(email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = (chrono::Utc::now()
            + chrono::Duration::minutes(self.reset_token_expiry_minutes))
        .to_rfc3339();

        self.store
            .reset_token_repo()
            .insert(user.id, &hash_reset_token(&token), &expires_at)
            .await?;

        if let Err(e) = self.mailer.send_password_reset(email, &token).await {
            warn!("Failed to deliver reset token: {}", e);
        }

        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let now = chrono::Utc::now().to_rfc3339();
        let record = self
            .store
            .reset_token_repo()
            .find_valid(&hash_reset_token(token), &now)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        self.store
            .user_repo()
            .update_password(record.user_id, new_password, Some(&self.security))
            .await?;

        self.store.reset_token_repo().mark_used(record.id).await?;

        info!("Password reset completed for user {}", record.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_hash_is_stable_and_hex() {
        let a = hash_reset_token("some-token");
        let b = hash_reset_token("some-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(hash_reset_token("other-token"), a);
    }

    #[test]
    fn test_generated_reset_tokens_are_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
        assert_eq!(generate_reset_token().len(), 64);
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
