pub mod source_page;

pub use source_page::{
    DiscoveredDocument, DocumentFetcher, DocumentKind, HttpFetcher, discover_documents,
};
