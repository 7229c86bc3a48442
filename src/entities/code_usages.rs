use sea_orm::entity::prelude::*;

/// Append-only record of one successful registration against a code.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "code_usages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub code_id: i32,

    pub user_id: i32,

    pub used_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::auth_codes::Entity",
        from = "Column::CodeId",
        to = "super::auth_codes::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    AuthCodes,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::auth_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthCodes.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
