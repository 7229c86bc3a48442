use crate::entities::{auth_codes, code_usages, prelude::*};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::info;

pub struct AuthCodeRepository {
    conn: DatabaseConnection,
}

impl AuthCodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        code: &str,
        created_by: i32,
        expires_at: Option<String>,
        max_uses: i32,
        notes: Option<&str>,
    ) -> Result<auth_codes::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active_model = auth_codes::ActiveModel {
            code: Set(code.to_string()),
            created_by: Set(created_by),
            expires_at: Set(expires_at),
            max_uses: Set(max_uses),
            current_uses: Set(0),
            is_active: Set(true),
            notes: Set(notes.map(str::to_string)),
            created_at: Set(now),
            ..Default::default()
        };

        let res = AuthCodes::insert(active_model).exec(&self.conn).await?;
        info!("Created auth code #{} (max uses: {})", res.last_insert_id, max_uses);

        let model = AuthCodes::find_by_id(res.last_insert_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Inserted auth code not found"))?;

        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<auth_codes::Model>> {
        Ok(AuthCodes::find_by_id(id).one(&self.conn).await?)
    }

    /// Look up by the canonical (normalized) code string.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<auth_codes::Model>> {
        let model = AuthCodes::find()
            .filter(auth_codes::Column::Code.eq(code))
            .one(&self.conn)
            .await?;
        Ok(model)
    }

    pub async fn list(&self, limit: u64, offset: u64) -> Result<(Vec<auth_codes::Model>, u64)> {
        let total = AuthCodes::find().count(&self.conn).await?;

        let rows = AuthCodes::find()
            .order_by_desc(auth_codes::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?;

        Ok((rows, total))
    }

    /// Idempotent: revoking an already-inactive code is a no-op.
    pub async fn revoke(&self, id: i32) -> Result<bool> {
        let existing = AuthCodes::find_by_id(id).one(&self.conn).await?;
        let Some(model) = existing else {
            return Ok(false);
        };

        if model.is_active {
            let mut active: auth_codes::ActiveModel = model.into();
            active.is_active = Set(false);
            sea_orm::ActiveModelTrait::update(active, &self.conn).await?;
            info!("Revoked auth code #{}", id);
        }

        Ok(true)
    }

    pub async fn usages(&self, code_id: i32) -> Result<Vec<code_usages::Model>> {
        let rows = CodeUsages::find()
            .filter(code_usages::Column::CodeId.eq(code_id))
            .order_by_asc(code_usages::Column::UsedAt)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }
}
