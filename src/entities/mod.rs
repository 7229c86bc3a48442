pub mod prelude;

pub mod auth_codes;
pub mod client_keywords;
pub mod client_sources;
pub mod clients;
pub mod code_usages;
pub mod favorites;
pub mod keywords;
pub mod password_reset_tokens;
pub mod scrape_job_configs;
pub mod scrape_jobs;
pub mod scrape_results;
pub mod users;
