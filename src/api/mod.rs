use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{MethodRouter, delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod clients;
mod codes;
mod error;
mod favorites;
mod jobs;
mod keywords;
mod observability;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

/// Deserializer distinguishing an absent field from an explicit null.
pub(crate) fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    Option::<String>::deserialize(de).map(Some)
}

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn storage(&self) -> &crate::storage::JobStorage {
        &self.shared.storage
    }

    #[must_use]
    pub fn tokens(&self) -> &crate::services::TokenService {
        &self.shared.tokens
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn crate::services::AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn codes(&self) -> &Arc<dyn crate::services::CodeService> {
        &self.shared.code_service
    }

    #[must_use]
    pub fn clients(&self) -> &Arc<dyn crate::services::ClientService> {
        &self.shared.client_service
    }

    #[must_use]
    pub fn keywords(&self) -> &Arc<dyn crate::services::KeywordService> {
        &self.shared.keyword_service
    }

    #[must_use]
    pub fn jobs(&self) -> &Arc<dyn crate::services::JobService> {
        &self.shared.job_service
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.shared.config.auth.cookie_name
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.shared.config.server.secure_cookies
    }
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle).await)
}

/// Who may reach a route. User routes additionally require authentication;
/// Admin routes stack a role check on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    User,
    Admin,
}

struct RouteDef {
    method: &'static str,
    path: &'static str,
    access: Access,
    handler: MethodRouter<Arc<AppState>>,
}

fn route(
    method: &'static str,
    path: &'static str,
    access: Access,
    handler: MethodRouter<Arc<AppState>>,
) -> RouteDef {
    RouteDef {
        method,
        path,
        access,
        handler,
    }
}

/// The full route table. Declarative so collisions are a startup error, not
/// an accident of registration order.
#[rustfmt::skip]
fn route_table() -> Vec<RouteDef> {
    use Access::{Admin, Public, User};

    vec![
        // Auth
        route("POST", "/auth/login", Public, post(auth::login)),
        route("POST", "/auth/logout", Public, post(auth::logout)),
        route("POST", "/auth/register", Public, post(auth::register)),
        route("POST", "/auth/reset/request", Public, post(auth::request_reset)),
        route("POST", "/auth/reset/confirm", Public, post(auth::confirm_reset)),
        route("GET", "/auth/me", User, get(auth::get_current_user)),
        route("PUT", "/auth/password", User, put(auth::change_password)),

        // Invite codes (admin)
        route("POST", "/codes", Admin, post(codes::create_code)),
        route("GET", "/codes", Admin, get(codes::list_codes)),
        route("GET", "/codes/{id}", Admin, get(codes::get_code)),
        route("DELETE", "/codes/{id}", Admin, delete(codes::revoke_code)),

        // Clients
        route("GET", "/clients", User, get(clients::list_clients)),
        route("POST", "/clients", Admin, post(clients::create_client)),
        route("GET", "/clients/{id}", User, get(clients::get_client)),
        route("PUT", "/clients/{id}", Admin, put(clients::update_client)),
        route("DELETE", "/clients/{id}", Admin, delete(clients::deactivate_client)),
        route("GET", "/clients/{id}/sources", User, get(clients::list_sources)),
        route("POST", "/clients/{id}/sources", Admin, post(clients::add_source)),
        route("DELETE", "/clients/{id}/sources/{source_id}", Admin, delete(clients::remove_source)),
        route("GET", "/clients/{id}/keywords", User, get(clients::list_client_keywords)),
        route("POST", "/clients/{id}/keywords/{keyword_id}", Admin, post(clients::link_keyword)),
        route("DELETE", "/clients/{id}/keywords/{keyword_id}", Admin, delete(clients::unlink_keyword)),

        // Keywords
        route("GET", "/keywords", User, get(keywords::list_keywords)),
        route("POST", "/keywords", Admin, post(keywords::create_keyword)),
        route("GET", "/keywords/{id}", User, get(keywords::get_keyword)),
        route("PUT", "/keywords/{id}", Admin, put(keywords::update_keyword)),
        route("DELETE", "/keywords/{id}", Admin, delete(keywords::deactivate_keyword)),

        // Favorites
        route("GET", "/favorites", User, get(favorites::list_favorites)),
        route("POST", "/favorites/{client_id}", User, post(favorites::toggle_favorite)),

        // Jobs
        route("POST", "/jobs", User, post(jobs::submit_job)),
        route("GET", "/jobs", User, get(jobs::list_jobs)),
        route("GET", "/jobs/{id}", User, get(jobs::get_job)),
        route("POST", "/jobs/{id}/cancel", User, post(jobs::cancel_job)),
        route("GET", "/jobs/{id}/results", User, get(jobs::job_results)),
        route("GET", "/jobs/{id}/artifact", User, get(jobs::download_artifact)),
        route("DELETE", "/jobs/{id}/storage", Admin, delete(jobs::cleanup_job_storage)),

        // System
        route("GET", "/system/status", User, get(system::get_status)),
        route("GET", "/system/storage", User, get(system::get_storage_stats)),
        route("GET", "/system/metrics", User, get(system::get_metrics)),
    ]
}

/// Fails fast on two routes sharing method+path instead of letting
/// registration order decide who wins.
fn validate_route_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<()> {
    let mut seen = std::collections::HashSet::new();

    for (method, path) in pairs {
        if !seen.insert((*method, *path)) {
            anyhow::bail!("Route collision: {method} {path} registered twice");
        }
    }

    Ok(())
}

fn collect_routes(defs: Vec<RouteDef>) -> Router<Arc<AppState>> {
    let mut by_path: Vec<(&'static str, MethodRouter<Arc<AppState>>)> = Vec::new();

    for def in defs {
        if let Some((_, existing)) = by_path.iter_mut().find(|(path, _)| *path == def.path) {
            let merged = std::mem::take(existing).merge(def.handler);
            *existing = merged;
        } else {
            by_path.push((def.path, def.handler));
        }
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| {
            router.route(path, handler)
        })
}

pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let table = route_table();

    let pairs: Vec<(&str, &str)> = table.iter().map(|def| (def.method, def.path)).collect();
    validate_route_pairs(&pairs)?;

    let mut public = Vec::new();
    let mut user = Vec::new();
    let mut admin = Vec::new();

    for def in table {
        match def.access {
            Access::Public => public.push(def),
            Access::User => user.push(def),
            Access::Admin => admin.push(def),
        }
    }

    let admin_router =
        collect_routes(admin).route_layer(middleware::from_fn(auth::require_admin));

    let protected_router = collect_routes(user).merge(admin_router).route_layer(
        middleware::from_fn_with_state(state.clone(), auth::auth_middleware),
    );

    let api_router = collect_routes(public)
        .merge(protected_router)
        .with_state(state.clone());

    let cors_origins = state.config().server.cors_allowed_origins.clone();
    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Ok(Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table_has_no_collisions() {
        let table = route_table();
        let pairs: Vec<(&str, &str)> = table.iter().map(|def| (def.method, def.path)).collect();

        assert!(validate_route_pairs(&pairs).is_ok());
    }

    #[test]
    fn test_collision_detection_rejects_duplicates() {
        let pairs = [
            ("GET", "/clients"),
            ("POST", "/clients"),
            ("GET", "/clients"),
        ];

        let err = validate_route_pairs(&pairs).unwrap_err();
        assert!(err.to_string().contains("GET /clients"));
    }

    #[test]
    fn test_route_methods_match_handlers() {
        // The declared method strings exist for collision detection; each
        // must agree with the axum method router built next to it.
        for def in route_table() {
            assert!(
                matches!(def.method, "GET" | "POST" | "PUT" | "DELETE"),
                "Unexpected method {} for {}",
                def.method,
                def.path
            );
        }
    }
}
