use sea_orm::entity::prelude::*;

/// Per-job configuration, one-to-one with `scrape_jobs`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "scrape_job_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub job_id: i32,

    /// Inclusive ISO date bounds for candidate documents.
    pub date_from: Option<String>,

    pub date_to: Option<String>,

    /// Cap on documents scanned per job.
    pub max_pages: i32,

    pub include_minutes: bool,

    pub include_packages: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scrape_jobs::Entity",
        from = "Column::JobId",
        to = "super::scrape_jobs::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ScrapeJobs,
}

impl Related<super::scrape_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScrapeJobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
