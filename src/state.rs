use std::sync::Arc;
use tokio::sync::broadcast;

use crate::clients::HttpFetcher;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::parser::RegexEntityExtractor;
use crate::services::{
    AuthService, ClientService, CodeService, JobService, KeywordService, LogMailer, Mailer,
    ScrapePipeline, SeaOrmAuthService, SeaOrmClientService, SeaOrmCodeService, SeaOrmJobService,
    SeaOrmKeywordService, TokenService,
};
use crate::storage::JobStorage;

/// Build a shared HTTP client with reasonable defaults.
/// Reused across fetchers to enable connection pooling and avoid socket
/// exhaustion.
fn build_shared_http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(
            config.scraper.request_timeout_seconds.into(),
        ))
        .user_agent(config.scraper.user_agent.clone())
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Everything the serving process and the background workers share.
///
/// Config is loaded once at startup and never mutated; secret rotation is a
/// redeploy.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub storage: JobStorage,

    pub tokens: TokenService,

    pub auth_service: Arc<dyn AuthService>,

    pub code_service: Arc<dyn CodeService>,

    pub client_service: Arc<dyn ClientService>,

    pub keyword_service: Arc<dyn KeywordService>,

    pub job_service: Arc<dyn JobService>,

    pub pipeline: Arc<ScrapePipeline>,

    pub event_bus: broadcast::Sender<NotificationEvent>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let storage = JobStorage::new(&config.storage);
        let tokens = TokenService::new(&config.auth);

        let http_client = build_shared_http_client(&config)?;
        let fetcher = Arc::new(HttpFetcher::with_shared_client(
            http_client,
            config.scraper.fetch_attempts,
            std::time::Duration::from_millis(config.scraper.retry_backoff_ms),
        ));

        let pipeline = Arc::new(ScrapePipeline::new(
            store.clone(),
            storage.clone(),
            fetcher,
            Some(Arc::new(RegexEntityExtractor)),
            event_bus.clone(),
            config.scraper.clone(),
        ));

        let code_service = Arc::new(SeaOrmCodeService::new(store.clone())) as Arc<dyn CodeService>;

        let mailer = Arc::new(LogMailer) as Arc<dyn Mailer>;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            code_service.clone(),
            mailer,
            config.security.clone(),
            &config.auth,
        )) as Arc<dyn AuthService>;

        let client_service =
            Arc::new(SeaOrmClientService::new(store.clone())) as Arc<dyn ClientService>;

        let keyword_service =
            Arc::new(SeaOrmKeywordService::new(store.clone())) as Arc<dyn KeywordService>;

        let job_service = Arc::new(SeaOrmJobService::new(
            store.clone(),
            storage.clone(),
            pipeline.clone(),
            event_bus.clone(),
            config.scraper.default_max_pages,
        )) as Arc<dyn JobService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            storage,
            tokens,
            auth_service,
            code_service,
            client_service,
            keyword_service,
            job_service,
            pipeline,
            event_bus,
        })
    }
}
