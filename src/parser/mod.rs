pub mod entities;
pub mod keywords;

pub use entities::{EntityExtractor, ExtractedEntities, RegexEntityExtractor};
pub use keywords::{KeywordMatch, find_match};
