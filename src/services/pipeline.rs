//! The scrape pipeline: fetch source pages, discover and download PDFs,
//! extract text, match keywords, extract nearby entities, annotate matches,
//! and package artifacts.
//!
//! Error isolation is layered. A failed source is skipped unless every source
//! fails; a failed file is skipped; anything escaping those boundaries fails
//! the job with the captured message. Results persisted before a failure stay
//! visible.
//!
//! The pipeline is the only writer of its job's status row. Cancellation is a
//! flag checked between sources and between files; in-flight single-file work
//! is allowed to finish.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::task;
use tracing::{debug, info, warn};

use crate::clients::{DiscoveredDocument, DocumentFetcher, DocumentKind, discover_documents};
use crate::config::ScraperConfig;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::entities::scrape_job_configs;
use crate::parser::{EntityExtractor, keywords};
use crate::pdf::{self, PageAnnotation};
use crate::storage::{Category, JobStorage};

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub documents_downloaded: usize,
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub matches: usize,
}

enum Outcome {
    Finished(PipelineStats),
    Cancelled,
}

pub struct ScrapePipeline {
    store: Store,
    storage: JobStorage,
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: Option<Arc<dyn EntityExtractor>>,
    event_bus: broadcast::Sender<NotificationEvent>,
    config: ScraperConfig,
}

impl ScrapePipeline {
    #[must_use]
    pub fn new(
        store: Store,
        storage: JobStorage,
        fetcher: Arc<dyn DocumentFetcher>,
        extractor: Option<Arc<dyn EntityExtractor>>,
        event_bus: broadcast::Sender<NotificationEvent>,
        config: ScraperConfig,
    ) -> Self {
        Self {
            store,
            storage,
            fetcher,
            extractor,
            event_bus,
            config,
        }
    }

    /// Runs a job to a terminal state. Owns every status write for the job:
    /// callers get completion through the job row and the event bus, not a
    /// return value.
    pub async fn execute(&self, job_id: i32, cancel: Arc<AtomicBool>) {
        // A cancel raised while still pending wins before any work starts.
        if cancel.load(Ordering::Relaxed) {
            self.finish_cancelled(job_id).await;
            return;
        }

        match self.store.job_repo().try_mark_running(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Job {} is not pending; refusing to execute", job_id);
                return;
            }
            Err(e) => {
                warn!("Job {} could not transition to running: {}", job_id, e);
                return;
            }
        }

        let _ = self.event_bus.send(NotificationEvent::JobStarted { job_id });
        info!("Job {} started", job_id);

        match self.run(job_id, &cancel).await {
            Ok(Outcome::Finished(stats)) => {
                let results = self
                    .store
                    .job_repo()
                    .result_count(job_id)
                    .await
                    .unwrap_or(0);

                if let Err(e) = self.store.job_repo().mark_completed(job_id).await {
                    warn!("Job {} completed but status write failed: {}", job_id, e);
                    return;
                }

                metrics::counter!("minutarr_jobs_completed_total").increment(1);
                let _ = self
                    .event_bus
                    .send(NotificationEvent::JobCompleted { job_id, results });
                info!(
                    event = "job_completed",
                    job_id,
                    sources_ok = stats.sources_ok,
                    documents = stats.documents_processed,
                    matches = stats.matches,
                    "Job completed"
                );
            }
            Ok(Outcome::Cancelled) => self.finish_cancelled(job_id).await,
            Err(e) => {
                let message = format!("{e:#}");
                if let Err(db_err) = self.store.job_repo().mark_failed(job_id, &message).await {
                    warn!("Job {} failed and status write failed: {}", job_id, db_err);
                    return;
                }

                metrics::counter!("minutarr_jobs_failed_total").increment(1);
                let _ = self.event_bus.send(NotificationEvent::JobFailed {
                    job_id,
                    error: message.clone(),
                });
                warn!("Job {} failed: {}", job_id, message);
            }
        }
    }

    async fn finish_cancelled(&self, job_id: i32) {
        if let Err(e) = self.store.job_repo().mark_cancelled(job_id).await {
            warn!("Job {} cancel status write failed: {}", job_id, e);
            return;
        }
        let _ = self
            .event_bus
            .send(NotificationEvent::JobCancelled { job_id });
        info!("Job {} cancelled", job_id);
    }

    async fn run(&self, job_id: i32, cancel: &AtomicBool) -> Result<Outcome> {
        let (job, config) = self
            .store
            .get_job_with_config(job_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Job {job_id} disappeared"))?;

        let sources = self.store.client_repo().sources(job.client_id).await?;
        let keyword_rows = self
            .store
            .client_repo()
            .active_keywords(job.client_id)
            .await?;
        let keyword_terms: Vec<String> = keyword_rows.into_iter().map(|k| k.term).collect();

        if keyword_terms.is_empty() {
            debug!("Job {}: client has no active keywords", job_id);
        }

        // Phase 1: fetch sources, discover and download candidate documents.
        let raw_dir = self.storage.ensure_dir(job_id, Category::Raw).await?;

        let mut stats = PipelineStats::default();
        let mut downloaded: Vec<(PathBuf, String, String)> = Vec::new();
        let mut budget = usize::try_from(config.max_pages.max(0)).unwrap_or(0);

        for source in &sources {
            if cancel.load(Ordering::Relaxed) {
                return Ok(Outcome::Cancelled);
            }

            match self.fetch_source(job_id, source, &config, &raw_dir, &mut budget).await {
                Ok(mut files) => {
                    stats.sources_ok += 1;
                    stats.documents_downloaded += files.len();
                    downloaded.append(&mut files);
                }
                Err(e) => {
                    stats.sources_failed += 1;
                    warn!("Job {}: source {} failed: {:#}", job_id, source.url, e);
                    let _ = self.event_bus.send(NotificationEvent::SourceFailed {
                        job_id,
                        url: source.url.clone(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        if !sources.is_empty() && stats.sources_ok == 0 {
            anyhow::bail!(
                "all {} configured sources failed to fetch",
                sources.len()
            );
        }

        // Phase 2: extract, match, annotate per file. Failures skip the file.
        let annotated_dir = self.storage.ensure_dir(job_id, Category::Annotated).await?;

        for (path, file_name, source_url) in &downloaded {
            if cancel.load(Ordering::Relaxed) {
                return Ok(Outcome::Cancelled);
            }

            match self
                .process_file(job_id, path, file_name, source_url, &keyword_terms, &annotated_dir)
                .await
            {
                Ok(matches) => {
                    stats.documents_processed += 1;
                    stats.matches += matches;
                    let _ = self.event_bus.send(NotificationEvent::DocumentProcessed {
                        job_id,
                        file_name: file_name.clone(),
                        matches,
                    });
                }
                Err(e) => {
                    stats.documents_skipped += 1;
                    warn!("Job {}: skipping {}: {:#}", job_id, file_name, e);
                    let _ = self.event_bus.send(NotificationEvent::DocumentSkipped {
                        job_id,
                        file_name: file_name.clone(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        // Phase 3: package annotated output.
        if stats.matches > 0 {
            let artifact_dir = self.storage.ensure_dir(job_id, Category::Artifacts).await?;
            let dest = artifact_dir.join(format!("job_{job_id}.zip"));
            let annotated = annotated_dir.clone();

            task::spawn_blocking(move || pdf::package_artifacts(&annotated, &dest))
                .await
                .context("Artifact packaging task panicked")??;
        }

        Ok(Outcome::Finished(stats))
    }

    /// Fetches one source page and downloads its matching documents into raw
    /// storage. Per-document download failures are logged and skipped; only a
    /// page-level fetch failure fails the source.
    async fn fetch_source(
        &self,
        job_id: i32,
        source: &crate::entities::client_sources::Model,
        config: &scrape_job_configs::Model,
        raw_dir: &Path,
        budget: &mut usize,
    ) -> Result<Vec<(PathBuf, String, String)>> {
        let html = self.fetcher.fetch_page(&source.url).await?;

        let documents: Vec<DiscoveredDocument> = discover_documents(&source.url, &html)
            .into_iter()
            .filter(|doc| document_wanted(doc, config))
            .collect();

        let _ = self.event_bus.send(NotificationEvent::SourceFetched {
            job_id,
            url: source.url.clone(),
            documents_found: documents.len(),
        });
        debug!(
            "Job {}: {} candidate documents on {}",
            job_id,
            documents.len(),
            source.url
        );

        let mut files = Vec::new();

        for doc in documents {
            if *budget == 0 {
                debug!("Job {}: document budget exhausted", job_id);
                break;
            }

            match self.fetcher.download(&doc.url).await {
                Ok(bytes) => {
                    let file_name = unique_file_name(raw_dir, &doc.file_name);
                    let path = raw_dir.join(&file_name);
                    tokio::fs::write(&path, &bytes).await?;

                    *budget -= 1;
                    files.push((path, file_name, source.url.clone()));
                }
                Err(e) => {
                    warn!("Job {}: download failed for {}: {:#}", job_id, doc.url, e);
                }
            }

            if self.config.download_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.config.download_delay_ms,
                ))
                .await;
            }
        }

        Ok(files)
    }

    /// Extracts text, records one result row per (page, keyword) match, and
    /// writes the annotated copy.
    async fn process_file(
        &self,
        job_id: i32,
        path: &Path,
        file_name: &str,
        source_url: &str,
        keyword_terms: &[String],
        annotated_dir: &Path,
    ) -> Result<usize> {
        let owned_path = path.to_path_buf();
        let pages = task::spawn_blocking(move || pdf::extract_pages(&owned_path))
            .await
            .context("Text extraction task panicked")??;

        let mut rows: Vec<(i32, String, String, Option<String>)> = Vec::new();
        let mut annotations: Vec<PageAnnotation> = Vec::new();

        for (page_number, text) in &pages {
            for term in keyword_terms {
                let Some(found) = keywords::find_match(text, term) else {
                    continue;
                };

                let entities = self.extractor.as_ref().and_then(|extractor| {
                    let context = keywords::context_around(
                        text,
                        found.offset,
                        found.offset + term.len(),
                        400,
                    );
                    extractor.extract(&context).to_json()
                });

                let page = i32::try_from(*page_number).unwrap_or(i32::MAX);
                rows.push((page, term.clone(), found.snippet.clone(), entities));
                annotations.push(PageAnnotation {
                    page_number: *page_number,
                    keyword: term.clone(),
                    snippet: found.snippet,
                });
            }
        }

        if rows.is_empty() {
            return Ok(0);
        }

        self.store
            .add_results_batch(job_id, source_url, file_name, &rows)
            .await?;

        let source = path.to_path_buf();
        let dest = annotated_dir.join(file_name);
        let annots = annotations.clone();
        task::spawn_blocking(move || pdf::annotate_pdf(&source, &dest, &annots))
            .await
            .context("Annotation task panicked")??;

        Ok(rows.len())
    }
}

/// Applies the job config's inclusion flags and date range. Documents of
/// unknown kind or without a parseable date are kept; the filter exists to
/// narrow, not to demand metadata the source never provides.
fn document_wanted(doc: &DiscoveredDocument, config: &scrape_job_configs::Model) -> bool {
    match doc.kind {
        DocumentKind::Minutes if !config.include_minutes => return false,
        DocumentKind::Package if !config.include_packages => return false,
        _ => {}
    }

    if let Some(date) = doc.date {
        if let Some(from) = parse_iso(config.date_from.as_deref())
            && date < from
        {
            return false;
        }
        if let Some(to) = parse_iso(config.date_to.as_deref())
            && date > to
        {
            return false;
        }
    }

    true
}

fn parse_iso(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
}

/// Avoids clobbering when two sources link distinct files with one name.
fn unique_file_name(dir: &Path, file_name: &str) -> String {
    if !dir.join(file_name).exists() {
        return file_name.to_string();
    }

    let stem = Path::new(file_name)
        .file_stem()
        .map_or("document", |s| s.to_str().unwrap_or("document"));
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("pdf");

    for n in 2..1000 {
        let candidate = format!("{stem}_{n}.{ext}");
        if !dir.join(&candidate).exists() {
            return candidate;
        }
    }

    format!("{stem}_{}.{ext}", uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        include_minutes: bool,
        include_packages: bool,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> scrape_job_configs::Model {
        scrape_job_configs::Model {
            job_id: 1,
            date_from: date_from.map(str::to_string),
            date_to: date_to.map(str::to_string),
            max_pages: 25,
            include_minutes,
            include_packages,
        }
    }

    fn doc(kind: DocumentKind, date: Option<&str>) -> DiscoveredDocument {
        DiscoveredDocument {
            url: "https://example.gov/doc.pdf".to_string(),
            file_name: "doc.pdf".to_string(),
            link_text: "Doc".to_string(),
            kind,
            date: date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        }
    }

    #[test]
    fn test_inclusion_flags() {
        let cfg = config(true, false, None, None);
        assert!(document_wanted(&doc(DocumentKind::Minutes, None), &cfg));
        assert!(!document_wanted(&doc(DocumentKind::Package, None), &cfg));
        assert!(document_wanted(&doc(DocumentKind::Other, None), &cfg));
    }

    #[test]
    fn test_date_range_filter() {
        let cfg = config(true, true, Some("2025-01-01"), Some("2025-06-30"));

        assert!(document_wanted(&doc(DocumentKind::Minutes, Some("2025-03-01")), &cfg));
        assert!(!document_wanted(&doc(DocumentKind::Minutes, Some("2024-12-31")), &cfg));
        assert!(!document_wanted(&doc(DocumentKind::Minutes, Some("2025-07-01")), &cfg));

        // Undated documents pass a date filter.
        assert!(document_wanted(&doc(DocumentKind::Minutes, None), &cfg));
    }

    #[test]
    fn test_unique_file_name() {
        let dir = std::env::temp_dir().join(format!("minutarr-unique-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        assert_eq!(unique_file_name(&dir, "minutes.pdf"), "minutes.pdf");

        std::fs::write(dir.join("minutes.pdf"), b"x").unwrap();
        assert_eq!(unique_file_name(&dir, "minutes.pdf"), "minutes_2.pdf");
    }
}
