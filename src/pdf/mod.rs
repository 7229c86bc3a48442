//! PDF handling: per-page text extraction, match annotation, and artifact
//! packaging. All functions here do blocking I/O; the pipeline runs them on
//! `spawn_blocking`.

pub mod annotate;
pub mod archive;
pub mod text;

pub use annotate::{PageAnnotation, annotate_pdf};
pub use archive::package_artifacts;
pub use text::extract_pages;
