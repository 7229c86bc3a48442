use crate::entities::{password_reset_tokens, prelude::*};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

pub struct ResetTokenRepository {
    conn: DatabaseConnection,
}

impl ResetTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, user_id: i32, token_hash: &str, expires_at: &str) -> Result<()> {
        let active_model = password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            token_hash: Set(token_hash.to_string()),
            expires_at: Set(expires_at.to_string()),
            used: Set(false),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        PasswordResetTokens::insert(active_model)
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Unused, unexpired token matching the hash.
    pub async fn find_valid(
        &self,
        token_hash: &str,
        now: &str,
    ) -> Result<Option<password_reset_tokens::Model>> {
        let row = PasswordResetTokens::find()
            .filter(password_reset_tokens::Column::TokenHash.eq(token_hash))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .filter(password_reset_tokens::Column::ExpiresAt.gt(now))
            .one(&self.conn)
            .await?;
        Ok(row)
    }

    pub async fn mark_used(&self, id: i32) -> Result<()> {
        PasswordResetTokens::update_many()
            .col_expr(
                password_reset_tokens::Column::Used,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(password_reset_tokens::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn prune_expired(&self, now: &str) -> Result<u64> {
        let result = PasswordResetTokens::delete_many()
            .filter(password_reset_tokens::Column::ExpiresAt.lt(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
