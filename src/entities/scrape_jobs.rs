use sea_orm::entity::prelude::*;

/// One execution of the fetch/extract/match/highlight/package pipeline.
///
/// Status: pending -> running -> {completed, failed, cancelled}. Terminal
/// states are final. `started_at` is set only on the transition into running,
/// `completed_at` only on a terminal transition, `error_message` only when
/// the job failed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "scrape_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub client_id: i32,

    pub status: String,

    pub created_by: i32,

    pub created_at: String,

    pub started_at: Option<String>,

    pub completed_at: Option<String>,

    pub error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Clients,
    #[sea_orm(has_one = "super::scrape_job_configs::Entity")]
    ScrapeJobConfigs,
    #[sea_orm(has_many = "super::scrape_results::Entity")]
    ScrapeResults,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::scrape_job_configs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScrapeJobConfigs.def()
    }
}

impl Related<super::scrape_results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScrapeResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
