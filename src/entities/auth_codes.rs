use sea_orm::entity::prelude::*;

/// Admin-issued invite code gating self-registration.
///
/// Status (active / revoked / expired / exhausted) is derived at read time,
/// never stored. Rows are kept forever as a historical record.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Canonical form: 12 uppercase alphanumerics, no hyphens.
    #[sea_orm(unique)]
    pub code: String,

    pub created_by: i32,

    pub expires_at: Option<String>,

    pub max_uses: i32,

    /// Invariant: current_uses <= max_uses
    pub current_uses: i32,

    pub is_active: bool,

    pub notes: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::code_usages::Entity")]
    CodeUsages,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::code_usages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CodeUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
