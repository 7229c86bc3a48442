//! Named-entity extraction around keyword matches.
//!
//! The extractor is a pluggable seam: the pipeline records matches whether or
//! not an extractor is present, and a model-backed implementation can replace
//! the regex default without touching the pipeline.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Entities pulled from the text surrounding a keyword match.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub monetary_amounts: Vec<String>,
    pub dates: Vec<String>,
}

impl ExtractedEntities {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
            && self.locations.is_empty()
            && self.monetary_amounts.is_empty()
            && self.dates.is_empty()
    }

    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(self).ok()
    }
}

pub trait EntityExtractor: Send + Sync {
    fn extract(&self, context: &str) -> ExtractedEntities;
}

struct EntityRegex {
    money: Regex,
    date: Regex,
    organization: Regex,
    street: Regex,
    jurisdiction: Regex,
}

impl EntityRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<EntityRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    money: Regex::new(
                        r"\$\s?\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?(?:\s?(?:thousand|million|billion))?",
                    )
                    .ok()?,
                    date: Regex::new(
                        r"(?x)
                        \d{4}-\d{2}-\d{2}
                        | \d{1,2}[/-]\d{1,2}[/-]\d{4}
                        | (?i:January|February|March|April|May|June|July|August|September|October|November|December)\ \d{1,2},?\ \d{4}",
                    )
                    .ok()?,
                    organization: Regex::new(
                        r"(?:[A-Z][A-Za-z&'.-]+\s+){0,4}(?:Department|Commission|Council|Committee|District|Authority|Agency|Board|Bureau|Corporation|Association|Company|Inc\.|LLC)",
                    )
                    .ok()?,
                    street: Regex::new(
                        r"\d+\s+(?:[A-Z][A-Za-z]*\.?\s+){1,4}(?:Street|St\.?|Avenue|Ave\.?|Road|Rd\.?|Boulevard|Blvd\.?|Drive|Dr\.?|Lane|Ln\.?|Way|Court|Ct\.?|Plaza|Parkway)",
                    )
                    .ok()?,
                    jurisdiction: Regex::new(
                        r"(?:City|County|Town|Village|Township|Borough)\s+of\s+[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)?",
                    )
                    .ok()?,
                })
            })
            .as_ref()
    }
}

/// Regex-based default extractor. Tuned for the phrasing of meeting minutes;
/// precision over recall.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexEntityExtractor;

fn collect_unique(re: &Regex, text: &str, out: &mut Vec<String>) {
    for m in re.find_iter(text) {
        let value = m.as_str().trim().to_string();
        if !out.contains(&value) {
            out.push(value);
        }
    }
}

impl EntityExtractor for RegexEntityExtractor {
    fn extract(&self, context: &str) -> ExtractedEntities {
        let Some(re) = EntityRegex::get() else {
            return ExtractedEntities::default();
        };

        let mut entities = ExtractedEntities::default();

        collect_unique(&re.money, context, &mut entities.monetary_amounts);
        collect_unique(&re.date, context, &mut entities.dates);
        collect_unique(&re.organization, context, &mut entities.organizations);
        collect_unique(&re.jurisdiction, context, &mut entities.organizations);
        collect_unique(&re.street, context, &mut entities.locations);

        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monetary_amounts() {
        let extractor = RegexEntityExtractor;
        let entities = extractor
            .extract("approved a budget of $1,250,000.00 plus $3 million in bonds");

        assert_eq!(
            entities.monetary_amounts,
            vec!["$1,250,000.00", "$3 million"]
        );
    }

    #[test]
    fn test_dates() {
        let extractor = RegexEntityExtractor;
        let entities =
            extractor.extract("continued from 2025-05-06 to the June 17, 2025 session");

        assert_eq!(entities.dates, vec!["2025-05-06", "June 17, 2025"]);
    }

    #[test]
    fn test_organizations_and_jurisdictions() {
        let extractor = RegexEntityExtractor;
        let entities = extractor
            .extract("The Planning Commission and the City of Springfield reviewed the plat.");

        assert!(entities
            .organizations
            .iter()
            .any(|o| o.contains("Planning Commission")));
        assert!(entities
            .organizations
            .iter()
            .any(|o| o == "City of Springfield"));
    }

    #[test]
    fn test_street_addresses() {
        let extractor = RegexEntityExtractor;
        let entities = extractor.extract("the parcel at 450 West Main Street was rezoned");

        assert_eq!(entities.locations, vec!["450 West Main Street"]);
    }

    #[test]
    fn test_empty_context() {
        let extractor = RegexEntityExtractor;
        let entities = extractor.extract("nothing of note here");

        assert!(entities.is_empty());
        assert!(entities.to_json().is_none());
    }

    #[test]
    fn test_json_payload_shape() {
        let extractor = RegexEntityExtractor;
        let entities = extractor.extract("a $500 fee");
        let json = entities.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["monetary_amounts"][0], "$500");
    }

    #[test]
    fn test_deduplicates() {
        let extractor = RegexEntityExtractor;
        let entities = extractor.extract("$500 now and $500 later");
        assert_eq!(entities.monetary_amounts.len(), 1);
    }
}
