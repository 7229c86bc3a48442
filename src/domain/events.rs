//! Domain events for the application.
//!
//! Sent via the broadcast event bus so the serving process can observe
//! pipeline progress without touching pipeline state.

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    JobSubmitted {
        job_id: i32,
        client_id: i32,
    },
    JobStarted {
        job_id: i32,
    },
    SourceFetched {
        job_id: i32,
        url: String,
        documents_found: usize,
    },
    SourceFailed {
        job_id: i32,
        url: String,
        error: String,
    },
    DocumentProcessed {
        job_id: i32,
        file_name: String,
        matches: usize,
    },
    DocumentSkipped {
        job_id: i32,
        file_name: String,
        error: String,
    },
    JobCompleted {
        job_id: i32,
        results: u64,
    },
    JobFailed {
        job_id: i32,
        error: String,
    },
    JobCancelled {
        job_id: i32,
    },
    CleanupFinished {
        files_deleted: usize,
        bytes_freed: u64,
    },

    Error {
        message: String,
    },
    Info {
        message: String,
    },
}
