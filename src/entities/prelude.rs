pub use super::auth_codes::Entity as AuthCodes;
pub use super::client_keywords::Entity as ClientKeywords;
pub use super::client_sources::Entity as ClientSources;
pub use super::clients::Entity as Clients;
pub use super::code_usages::Entity as CodeUsages;
pub use super::favorites::Entity as Favorites;
pub use super::keywords::Entity as Keywords;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::scrape_job_configs::Entity as ScrapeJobConfigs;
pub use super::scrape_jobs::Entity as ScrapeJobs;
pub use super::scrape_results::Entity as ScrapeResults;
pub use super::users::Entity as Users;
