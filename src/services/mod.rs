pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthSession, RegisterRequest, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;

pub mod code_service;
pub mod code_service_impl;
pub use code_service::{CodeDto, CodeError, CodeService, CodeStatus};
pub use code_service_impl::SeaOrmCodeService;

pub mod client_service;
pub mod client_service_impl;
pub use client_service::{ClientDto, ClientError, ClientService, KeywordDto, SourceDto};
pub use client_service_impl::SeaOrmClientService;

pub mod keyword_service;
pub mod keyword_service_impl;
pub use keyword_service::{KeywordError, KeywordService};
pub use keyword_service_impl::SeaOrmKeywordService;

pub mod job_service;
pub mod job_service_impl;
pub use job_service::{JobDto, JobError, JobService, ResultDto, SubmitJobRequest};
pub use job_service_impl::{CancelRegistry, SeaOrmJobService};

pub mod pipeline;
pub use pipeline::ScrapePipeline;

pub mod mailer;
pub use mailer::{LogMailer, Mailer};

pub mod token;
pub use token::{Claims, TokenError, TokenService};
