use sea_orm::entity::prelude::*;

/// One keyword match on one page of one scraped document.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "scrape_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub job_id: i32,

    pub source_url: String,

    pub file_name: String,

    pub page_number: i32,

    pub keyword: String,

    pub snippet: String,

    /// JSON payload: {"organizations": [..], "locations": [..],
    /// "monetary_amounts": [..], "dates": [..]}. Null when the entity
    /// extractor was unavailable.
    pub entities: Option<String>,

    pub created_at: String,
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
