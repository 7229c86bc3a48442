use crate::entities::{client_keywords, client_sources, clients, keywords, prelude::*};
use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::info;

pub struct ClientRepository {
    conn: DatabaseConnection,
}

impl ClientRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        created_by: i32,
    ) -> Result<clients::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active_model = clients::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.map(str::to_string)),
            is_active: Set(true),
            created_by: Set(created_by),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let res = Clients::insert(active_model).exec(&self.conn).await?;
        info!("Created client #{}: {}", res.last_insert_id, name);

        let model = Clients::find_by_id(res.last_insert_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Inserted client not found"))?;

        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<clients::Model>> {
        Ok(Clients::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<clients::Model>> {
        let model = Clients::find()
            .filter(clients::Column::Name.eq(name))
            .one(&self.conn)
            .await?;
        Ok(model)
    }

    /// Inactive clients are excluded unless `include_inactive` is set.
    pub async fn list(
        &self,
        include_inactive: bool,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<clients::Model>, u64)> {
        let mut query = Clients::find().order_by_asc(clients::Column::Name);

        if !include_inactive {
            query = query.filter(clients::Column::IsActive.eq(true));
        }

        let total = query.clone().count(&self.conn).await?;
        let rows = query.limit(limit).offset(offset).all(&self.conn).await?;

        Ok((rows, total))
    }

    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<Option<clients::Model>> {
        let existing = Clients::find_by_id(id).one(&self.conn).await?;
        let Some(model) = existing else {
            return Ok(None);
        };

        let mut active: clients::ActiveModel = model.into();
        if let Some(name) = name {
            active.name = Set(name.to_string());
        }
        if let Some(description) = description {
            active.description = Set(description.map(str::to_string));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await?;
        Ok(Some(updated))
    }

    pub async fn set_active(&self, id: i32, is_active: bool) -> Result<bool> {
        let result = Clients::update_many()
            .col_expr(
                clients::Column::IsActive,
                sea_orm::sea_query::Expr::value(is_active),
            )
            .col_expr(
                clients::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(clients::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Source URLs
    // ========================================================================

    pub async fn add_source(
        &self,
        client_id: i32,
        url: &str,
        label: Option<&str>,
    ) -> Result<client_sources::Model> {
        let active_model = client_sources::ActiveModel {
            client_id: Set(client_id),
            url: Set(url.to_string()),
            label: Set(label.map(str::to_string)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let res = ClientSources::insert(active_model).exec(&self.conn).await?;

        let model = ClientSources::find_by_id(res.last_insert_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Inserted source not found"))?;

        Ok(model)
    }

    pub async fn remove_source(&self, client_id: i32, source_id: i32) -> Result<bool> {
        let result = ClientSources::delete_many()
            .filter(client_sources::Column::Id.eq(source_id))
            .filter(client_sources::Column::ClientId.eq(client_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn sources(&self, client_id: i32) -> Result<Vec<client_sources::Model>> {
        let rows = ClientSources::find()
            .filter(client_sources::Column::ClientId.eq(client_id))
            .order_by_asc(client_sources::Column::CreatedAt)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }

    // ========================================================================
    // Keyword associations
    // ========================================================================

    /// Idempotent: re-linking an existing pair is a no-op.
    pub async fn link_keyword(&self, client_id: i32, keyword_id: i32) -> Result<()> {
        let active_model = client_keywords::ActiveModel {
            client_id: Set(client_id),
            keyword_id: Set(keyword_id),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        ClientKeywords::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    client_keywords::Column::ClientId,
                    client_keywords::Column::KeywordId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn unlink_keyword(&self, client_id: i32, keyword_id: i32) -> Result<bool> {
        let result = ClientKeywords::delete_many()
            .filter(client_keywords::Column::ClientId.eq(client_id))
            .filter(client_keywords::Column::KeywordId.eq(keyword_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Active keywords linked to the client, ordered by term.
    pub async fn active_keywords(&self, client_id: i32) -> Result<Vec<keywords::Model>> {
        let rows = Keywords::find()
            .join(JoinType::InnerJoin, keywords::Relation::ClientKeywords.def())
            .filter(client_keywords::Column::ClientId.eq(client_id))
            .filter(keywords::Column::IsActive.eq(true))
            .order_by_asc(keywords::Column::Term)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }

    /// All keywords linked to the client, active or not.
    pub async fn linked_keywords(&self, client_id: i32) -> Result<Vec<keywords::Model>> {
        let rows = Keywords::find()
            .join(JoinType::InnerJoin, keywords::Relation::ClientKeywords.def())
            .filter(client_keywords::Column::ClientId.eq(client_id))
            .order_by_asc(keywords::Column::Term)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }
}
