//! Outbound mail seam. Delivery itself is an external collaborator; the core
//! only hands over a recipient and a single-use reset token. The default
//! implementation logs instead of sending, which is what local deployments
//! run with.

use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers a password-reset token to the address. The raw token is never
    /// persisted, so failures here mean the user must request again.
    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()>;
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()> {
        info!(
            event = "password_reset_issued",
            email = %email,
            token = %token,
            "Password reset token issued (log delivery)"
        );
        Ok(())
    }
}
