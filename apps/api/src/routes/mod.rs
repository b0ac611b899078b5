pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::automation::handlers::start_handler;
use crate::logs::handlers::logs_handler;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Automation control surface
        .route("/api/start", post(start_handler))
        .route("/api/logs", get(logs_handler))
        .with_state(state)
}
