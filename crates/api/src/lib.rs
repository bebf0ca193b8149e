//! HTTP API server for the company registry.
//!
//! Exposes company CRUD behind bearer-token authentication, with structured
//! logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, header};
use axum::routing::{get, post};
use company_store::CompanyStore;
use domain::CompanyService;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use auth::Authenticator;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CompanyStore> {
    pub service: CompanyService<S>,
    pub auth: Arc<Authenticator>,
}

impl<S: CompanyStore> AppState<S> {
    pub fn new(service: CompanyService<S>, auth: Authenticator) -> Self {
        Self {
            service,
            auth: Arc::new(auth),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CompanyStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let auth_router = Router::new()
        .route("/auth/signin", post(auth::sign_in))
        .with_state(state.auth.clone());

    let companies = Router::new()
        .route("/api/companies", post(routes::companies::create::<S>))
        .route(
            "/api/companies/{id}",
            get(routes::companies::get::<S>)
                .patch(routes::companies::update::<S>)
                .delete(routes::companies::delete::<S>),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_bearer,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(companies)
        .merge(auth_router)
        .merge(metrics_router)
        .layer(security_header(
            header::CONTENT_SECURITY_POLICY,
            "default-src 'self'",
        ))
        .layer(security_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}
