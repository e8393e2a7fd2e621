//! HTTP API Layer
//!
//! REST binding of the sanction workflow using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one per workflow operation, plus health checks
//! - **Middleware**: JWT authentication, audit logging, tracing
//! - **DTOs**: request/response bodies, validated with `validator`
//! - **Error Handling**: workflow errors mapped to HTTP status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(engine, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_workflow::SanctionEngine;

use crate::config::ApiConfig;
use crate::handlers::{health, workflow};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SanctionEngine>,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// Everything under `/api/v1` requires a bearer token; the health
/// endpoints are public.
pub fn create_router(engine: SanctionEngine, config: ApiConfig) -> Router {
    let state = AppState {
        engine: Arc::new(engine),
        config,
    };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let request_routes = Router::new()
        .route("/", post(workflow::submit_claim))
        .route("/queue", get(workflow::pending_queue))
        .route("/open", get(workflow::open_requests))
        .route("/:id", get(workflow::get_request))
        .route("/:id/actions", post(workflow::process_action))
        .route("/:id/allocation", post(workflow::allocate));

    let api_routes = Router::new()
        .route("/steps", get(workflow::list_steps))
        .nest("/requests", request_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
