pub mod auth_code;
pub mod client;
pub mod favorite;
pub mod job;
pub mod keyword;
pub mod reset_token;
pub mod user;
