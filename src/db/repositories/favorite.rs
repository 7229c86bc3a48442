use crate::entities::{clients, favorites, prelude::*};
use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};

pub struct FavoriteRepository {
    conn: DatabaseConnection,
}

impl FavoriteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Idempotent: favoriting an already-favorited client is a no-op.
    pub async fn add(&self, user_id: i32, client_id: i32) -> Result<()> {
        let active_model = favorites::ActiveModel {
            user_id: Set(user_id),
            client_id: Set(client_id),
            favorited_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        Favorites::insert(active_model)
            .on_conflict(
                OnConflict::columns([favorites::Column::UserId, favorites::Column::ClientId])
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn remove(&self, user_id: i32, client_id: i32) -> Result<bool> {
        let result = Favorites::delete_many()
            .filter(favorites::Column::UserId.eq(user_id))
            .filter(favorites::Column::ClientId.eq(client_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn is_favorited(&self, user_id: i32, client_id: i32) -> Result<bool> {
        let row = Favorites::find_by_id((user_id, client_id))
            .one(&self.conn)
            .await?;
        Ok(row.is_some())
    }

    /// Favorited clients for a user, most recently favorited first.
    pub async fn clients_for_user(&self, user_id: i32) -> Result<Vec<clients::Model>> {
        let rows = Clients::find()
            .join(JoinType::InnerJoin, clients::Relation::Favorites.def())
            .filter(favorites::Column::UserId.eq(user_id))
            .order_by_desc(favorites::Column::FavoritedAt)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }
}
