use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "keywords")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub term: String,

    pub category: Option<String>,

    pub is_active: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::client_keywords::Entity")]
    ClientKeywords,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        super::client_keywords::Relation::Clients.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::client_keywords::Relation::Keywords.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
