//! End-to-end scrape-job lifecycle tests against a canned fetcher: no
//! network, real SQLite, real PDFs, real storage directories.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::broadcast;

use minutarr::clients::DocumentFetcher;
use minutarr::config::{ScraperConfig, StorageConfig};
use minutarr::db::Store;
use minutarr::domain::{ClientId, JobId, JobStatus};
use minutarr::parser::RegexEntityExtractor;
use minutarr::services::job_service::{JobDto, JobError, SubmitJobRequest};
use minutarr::services::{JobService, ScrapePipeline, SeaOrmJobService};
use minutarr::storage::{Category, JobStorage};

/// Serves canned pages and files; anything unknown behaves like a dead host.
#[derive(Default)]
struct StubFetcher {
    pages: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

#[async_trait]
impl DocumentFetcher for StubFetcher {
    async fn fetch_page(&self, url: &str) -> anyhow::Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused: {url}"))
    }

    async fn download(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused: {url}"))
    }
}

/// Minimal but valid PDF with one page per text.
fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

struct Harness {
    store: Store,
    storage: JobStorage,
    pipeline: Arc<ScrapePipeline>,
    jobs: Arc<dyn JobService>,
}

async fn harness(fetcher: StubFetcher) -> Harness {
    let unique = uuid::Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("minutarr-job-test-{unique}.db"));
    let storage_root = std::env::temp_dir().join(format!("minutarr-job-storage-{unique}"));

    let store = Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("store");

    let storage = JobStorage::new(&StorageConfig {
        root: storage_root.to_string_lossy().to_string(),
        ..Default::default()
    });

    let scraper_config = ScraperConfig {
        download_delay_ms: 0,
        fetch_attempts: 1,
        ..Default::default()
    };

    let (event_bus, _) = broadcast::channel(100);

    let pipeline = Arc::new(ScrapePipeline::new(
        store.clone(),
        storage.clone(),
        Arc::new(fetcher),
        Some(Arc::new(RegexEntityExtractor)),
        event_bus.clone(),
        scraper_config.clone(),
    ));

    let jobs = Arc::new(SeaOrmJobService::new(
        store.clone(),
        storage.clone(),
        pipeline.clone(),
        event_bus,
        scraper_config.default_max_pages,
    )) as Arc<dyn JobService>;

    Harness {
        store,
        storage,
        pipeline,
        jobs,
    }
}

/// Seeds a client with one source URL and the given keywords; returns its id.
async fn seed_client(store: &Store, name: &str, sources: &[&str], keywords: &[&str]) -> i32 {
    let client = store.client_repo().create(name, None, 1).await.unwrap();

    for source in sources {
        store
            .client_repo()
            .add_source(client.id, source, None)
            .await
            .unwrap();
    }

    for term in keywords {
        let keyword = store.keyword_repo().create(term, None).await.unwrap();
        store
            .client_repo()
            .link_keyword(client.id, keyword.id)
            .await
            .unwrap();
    }

    client.id
}

fn submit_request(client_id: i32) -> SubmitJobRequest {
    SubmitJobRequest {
        client_id: ClientId::new(client_id),
        date_from: None,
        date_to: None,
        max_pages: None,
        include_minutes: true,
        include_packages: true,
    }
}

async fn wait_terminal(jobs: &Arc<dyn JobService>, id: i32) -> JobDto {
    for _ in 0..200 {
        let job = jobs.get(JobId::new(id)).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("job {id} never reached a terminal state");
}

fn minutes_page(host: &str) -> String {
    format!(
        r#"<html><body>
        <a href="{host}/docs/minutes-2025-06-17.pdf">Council Minutes June 17, 2025</a>
        </body></html>"#
    )
}

#[tokio::test]
async fn job_with_matches_completes_with_results_annotations_and_artifact() {
    let host = "https://stub.test";
    let pdf = build_pdf(&[
        "Call to order and roll call.",
        "The zoning variance for 450 West Main Street was approved with a budget of $250,000 by the Planning Commission.",
    ]);

    let mut fetcher = StubFetcher::default();
    fetcher
        .pages
        .insert(format!("{host}/meetings"), minutes_page(host));
    fetcher
        .files
        .insert(format!("{host}/docs/minutes-2025-06-17.pdf"), pdf);

    let h = harness(fetcher).await;
    let client_id = seed_client(
        &h.store,
        "Springfield",
        &[&format!("{host}/meetings")],
        &["zoning variance"],
    )
    .await;

    let job = h.jobs.submit(submit_request(client_id), 1).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.started_at.is_none());

    let done = wait_terminal(&h.jobs, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());
    assert!(done.error_message.is_none());
    assert_eq!(done.result_count, 1);

    let (results, total) = h.jobs.results(JobId::new(job.id), 50, 0).await.unwrap();
    assert_eq!(total, 1);
    let result = &results[0];
    assert_eq!(result.file_name, "minutes-2025-06-17.pdf");
    assert_eq!(result.page_number, 2);
    assert_eq!(result.keyword, "zoning variance");
    assert!(result.snippet.contains("zoning variance"));

    // Entity payload captured from the surrounding context.
    let entities = result.entities.as_ref().expect("entities payload");
    assert!(
        entities["monetary_amounts"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "$250,000")
    );
    assert!(
        entities["locations"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "450 West Main Street")
    );

    // Raw download, annotated copy, and packaged artifact all exist.
    assert!(
        h.storage
            .path_for(job.id, Category::Raw)
            .join("minutes-2025-06-17.pdf")
            .exists()
    );
    assert!(
        h.storage
            .path_for(job.id, Category::Annotated)
            .join("minutes-2025-06-17.pdf")
            .exists()
    );

    let artifact = h.jobs.artifact_path(JobId::new(job.id)).await.unwrap();
    assert!(artifact.ends_with(format!("job_{}.zip", job.id)));
    assert!(artifact.exists());

    // The annotated copy still parses and gained an annotation.
    let annotated =
        lopdf::Document::load(h.storage.path_for(job.id, Category::Annotated).join("minutes-2025-06-17.pdf"))
            .expect("annotated PDF should parse");
    let pages = annotated.get_pages();
    let page_two = pages.get(&2).unwrap();
    let page_dict = annotated.get_object(*page_two).unwrap().as_dict().unwrap();
    assert!(page_dict.has(b"Annots"));
}

#[tokio::test]
async fn zero_keyword_job_completes_with_zero_results() {
    let host = "https://stub.test";
    let pdf = build_pdf(&["Routine business, nothing tracked."]);

    let mut fetcher = StubFetcher::default();
    fetcher
        .pages
        .insert(format!("{host}/meetings"), minutes_page(host));
    fetcher
        .files
        .insert(format!("{host}/docs/minutes-2025-06-17.pdf"), pdf);

    let h = harness(fetcher).await;
    let client_id = seed_client(&h.store, "Quiet Agency", &[&format!("{host}/meetings")], &[]).await;

    let job = h.jobs.submit(submit_request(client_id), 1).await.unwrap();
    let done = wait_terminal(&h.jobs, job.id).await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.result_count, 0);

    // No matches means no artifact.
    assert!(matches!(
        h.jobs.artifact_path(JobId::new(job.id)).await,
        Err(JobError::ArtifactNotFound(_))
    ));
}

#[tokio::test]
async fn one_dead_source_is_survivable_but_all_dead_sources_fail_the_job() {
    let host = "https://stub.test";
    let pdf = build_pdf(&["The rezoning request was tabled."]);

    let mut fetcher = StubFetcher::default();
    fetcher
        .pages
        .insert(format!("{host}/meetings"), minutes_page(host));
    fetcher
        .files
        .insert(format!("{host}/docs/minutes-2025-06-17.pdf"), pdf);

    let h = harness(fetcher).await;

    // One good source, one dead: completes.
    let client_id = seed_client(
        &h.store,
        "Mostly Reachable",
        &[&format!("{host}/meetings"), "https://dead.test/meetings"],
        &["rezoning"],
    )
    .await;

    let job = h.jobs.submit(submit_request(client_id), 1).await.unwrap();
    let done = wait_terminal(&h.jobs, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.result_count, 1);

    // Every source dead: fails with a descriptive message.
    let client_id = seed_client(
        &h.store,
        "Unreachable",
        &["https://dead.test/a", "https://dead.test/b"],
        &["rezoning"],
    )
    .await;

    let job = h.jobs.submit(submit_request(client_id), 1).await.unwrap();
    let done = wait_terminal(&h.jobs, job.id).await;
    assert_eq!(done.status, JobStatus::Failed);
    let message = done.error_message.expect("failure message");
    assert!(message.contains("sources failed"));
}

#[tokio::test]
async fn terminal_jobs_are_final() {
    let host = "https://stub.test";
    let mut fetcher = StubFetcher::default();
    fetcher
        .pages
        .insert(format!("{host}/meetings"), "<html></html>".to_string());

    let h = harness(fetcher).await;
    let client_id = seed_client(&h.store, "Finality", &[&format!("{host}/meetings")], &[]).await;

    let job = h.jobs.submit(submit_request(client_id), 1).await.unwrap();
    let done = wait_terminal(&h.jobs, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    let first_completed_at = done.completed_at.clone();

    // Re-running the pipeline against a terminal job is refused.
    h.pipeline
        .execute(job.id, Arc::new(AtomicBool::new(false)))
        .await;

    let after = h.jobs.get(JobId::new(job.id)).await.unwrap();
    assert_eq!(after.status, JobStatus::Completed);
    assert_eq!(after.completed_at, first_completed_at);

    // Cancelling a terminal job is an invalid transition.
    assert!(matches!(
        h.jobs.cancel(JobId::new(job.id)).await,
        Err(JobError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn pending_job_without_worker_can_be_cancelled_directly() {
    let fetcher = StubFetcher::default();
    let h = harness(fetcher).await;

    let client_id = seed_client(&h.store, "Orphans", &[], &[]).await;

    // Insert a pending row directly, as if the process died before its
    // worker ran.
    let config = minutarr::entities::scrape_job_configs::Model {
        job_id: 0,
        date_from: None,
        date_to: None,
        max_pages: 10,
        include_minutes: true,
        include_packages: true,
    };
    let job_id = h.store.job_repo().insert(client_id, 1, &config).await.unwrap();

    h.jobs.cancel(JobId::new(job_id)).await.unwrap();

    let job = h.jobs.get(JobId::new(job_id)).await.unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.completed_at.is_some());
    assert!(job.started_at.is_none());
}

#[tokio::test]
async fn date_range_filters_discovered_documents() {
    let host = "https://stub.test";
    let in_range = build_pdf(&["Budget hearing for the library."]);
    let out_of_range = build_pdf(&["Budget hearing for the stadium."]);

    let page = format!(
        r#"<html><body>
        <a href="{host}/docs/minutes-2025-06-17.pdf">Minutes June 17, 2025</a>
        <a href="{host}/docs/minutes-2024-01-05.pdf">Minutes January 5, 2024</a>
        </body></html>"#
    );

    let mut fetcher = StubFetcher::default();
    fetcher.pages.insert(format!("{host}/meetings"), page);
    fetcher
        .files
        .insert(format!("{host}/docs/minutes-2025-06-17.pdf"), in_range);
    fetcher
        .files
        .insert(format!("{host}/docs/minutes-2024-01-05.pdf"), out_of_range);

    let h = harness(fetcher).await;
    let client_id = seed_client(
        &h.store,
        "Date Bounded",
        &[&format!("{host}/meetings")],
        &["budget"],
    )
    .await;

    let mut request = submit_request(client_id);
    request.date_from = Some("2025-01-01".to_string());
    request.date_to = Some("2025-12-31".to_string());

    let job = h.jobs.submit(request, 1).await.unwrap();
    let done = wait_terminal(&h.jobs, job.id).await;

    assert_eq!(done.status, JobStatus::Completed);

    let (results, total) = h.jobs.results(JobId::new(job.id), 50, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(results[0].file_name, "minutes-2025-06-17.pdf");
}

#[tokio::test]
async fn results_remain_joinable_after_client_deactivation() {
    let host = "https://stub.test";
    let pdf = build_pdf(&["A stormwater permit fee of $75 was adopted."]);

    let mut fetcher = StubFetcher::default();
    fetcher
        .pages
        .insert(format!("{host}/meetings"), minutes_page(host));
    fetcher
        .files
        .insert(format!("{host}/docs/minutes-2025-06-17.pdf"), pdf);

    let h = harness(fetcher).await;
    let client_id = seed_client(
        &h.store,
        "Soon Inactive",
        &[&format!("{host}/meetings")],
        &["stormwater"],
    )
    .await;

    let job = h.jobs.submit(submit_request(client_id), 1).await.unwrap();
    let done = wait_terminal(&h.jobs, job.id).await;
    assert_eq!(done.status, JobStatus::Completed);

    h.store.client_repo().set_active(client_id, false).await.unwrap();

    // Results of existing jobs survive the soft delete.
    let (results, total) = h.jobs.results(JobId::new(job.id), 50, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(results[0].keyword, "stormwater");

    // But new submissions are refused.
    assert!(matches!(
        h.jobs.submit(submit_request(client_id), 1).await,
        Err(JobError::ClientInactive(_))
    ));
}

#[tokio::test]
async fn storage_cleanup_is_idempotent_and_artifact_aware() {
    let host = "https://stub.test";
    let pdf = build_pdf(&["The annexation ordinance passed."]);

    let mut fetcher = StubFetcher::default();
    fetcher
        .pages
        .insert(format!("{host}/meetings"), minutes_page(host));
    fetcher
        .files
        .insert(format!("{host}/docs/minutes-2025-06-17.pdf"), pdf);

    let h = harness(fetcher).await;
    let client_id = seed_client(
        &h.store,
        "Cleanup Target",
        &[&format!("{host}/meetings")],
        &["annexation"],
    )
    .await;

    let job = h.jobs.submit(submit_request(client_id), 1).await.unwrap();
    wait_terminal(&h.jobs, job.id).await;

    let first = h
        .jobs
        .cleanup_storage(JobId::new(job.id), false)
        .await
        .unwrap();
    assert!(first.files_deleted >= 2); // raw + annotated

    // Artifact survives a default cleanup.
    assert!(h.jobs.artifact_path(JobId::new(job.id)).await.is_ok());

    let second = h
        .jobs
        .cleanup_storage(JobId::new(job.id), false)
        .await
        .unwrap();
    assert_eq!(second.files_deleted, 0);

    let with_artifacts = h
        .jobs
        .cleanup_storage(JobId::new(job.id), true)
        .await
        .unwrap();
    assert_eq!(with_artifacts.files_deleted, 1);
    assert!(h.jobs.artifact_path(JobId::new(job.id)).await.is_err());
}
