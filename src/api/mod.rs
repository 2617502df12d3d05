//! HTTP adapter over the ledger
//!
//! Scan-event producers post events here; dashboards read the chain and
//! auditors ask for a verification pass.

pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::ledger::Ledger;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/ledger", get(routes::get_ledger))
        .route("/api/ledger/events", post(routes::append_event))
        .route("/api/ledger/verify", get(routes::verify_ledger))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}
