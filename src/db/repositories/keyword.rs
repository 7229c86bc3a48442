use crate::entities::{keywords, prelude::*};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::info;

pub struct KeywordRepository {
    conn: DatabaseConnection,
}

impl KeywordRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, term: &str, category: Option<&str>) -> Result<keywords::Model> {
        let active_model = keywords::ActiveModel {
            term: Set(term.to_string()),
            category: Set(category.map(str::to_string)),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let res = Keywords::insert(active_model).exec(&self.conn).await?;
        info!("Created keyword #{}: {}", res.last_insert_id, term);

        let model = Keywords::find_by_id(res.last_insert_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Inserted keyword not found"))?;

        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<keywords::Model>> {
        Ok(Keywords::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn get_by_term(&self, term: &str) -> Result<Option<keywords::Model>> {
        let model = Keywords::find()
            .filter(keywords::Column::Term.eq(term))
            .one(&self.conn)
            .await?;
        Ok(model)
    }

    pub async fn list(
        &self,
        include_inactive: bool,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<keywords::Model>, u64)> {
        let mut query = Keywords::find().order_by_asc(keywords::Column::Term);

        if !include_inactive {
            query = query.filter(keywords::Column::IsActive.eq(true));
        }

        let total = query.clone().count(&self.conn).await?;
        let rows = query.limit(limit).offset(offset).all(&self.conn).await?;

        Ok((rows, total))
    }

    pub async fn update(
        &self,
        id: i32,
        term: Option<&str>,
        category: Option<Option<&str>>,
    ) -> Result<Option<keywords::Model>> {
        let existing = Keywords::find_by_id(id).one(&self.conn).await?;
        let Some(model) = existing else {
            return Ok(None);
        };

        let mut active: keywords::ActiveModel = model.into();
        if let Some(term) = term {
            active.term = Set(term.to_string());
        }
        if let Some(category) = category {
            active.category = Set(category.map(str::to_string));
        }

        let updated = active.update(&self.conn).await?;
        Ok(Some(updated))
    }

    pub async fn set_active(&self, id: i32, is_active: bool) -> Result<bool> {
        let result = Keywords::update_many()
            .col_expr(
                keywords::Column::IsActive,
                sea_orm::sea_query::Expr::value(is_active),
            )
            .filter(keywords::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
