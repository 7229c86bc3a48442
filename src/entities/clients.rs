use sea_orm::entity::prelude::*;

/// Tracked government agency whose public meeting documents are scraped.
/// Soft-deleted via `is_active`; existing results stay joinable.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub description: Option<String>,

    pub is_active: bool,

    pub created_by: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::client_sources::Entity")]
    ClientSources,
    #[sea_orm(has_many = "super::client_keywords::Entity")]
    ClientKeywords,
    #[sea_orm(has_many = "super::favorites::Entity")]
    Favorites,
    #[sea_orm(has_many = "super::scrape_jobs::Entity")]
    ScrapeJobs,
}

impl Related<super::client_sources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientSources.def()
    }
}

impl Related<super::scrape_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScrapeJobs.def()
    }
}

impl Related<super::keywords::Entity> for Entity {
    fn to() -> RelationDef {
        super::client_keywords::Relation::Keywords.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::client_keywords::Relation::Clients.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
