//! Axum handler for triggering a pipeline run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;

use super::pipeline;

/// Holds the single run slot; releases it when dropped, however the
/// pipeline task ends.
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl RunGuard {
    /// Claims the run slot; `None` when a run is already active.
    pub fn try_acquire(active: &Arc<AtomicBool>) -> Option<Self> {
        active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                active: Arc::clone(active),
            })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// POST /api/start
///
/// Responds immediately; the pipeline runs on a detached task and reports
/// only through the log stream. A second start while a run is active is
/// rejected rather than sharing or duplicating the browser session.
pub async fn start_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let Some(guard) = RunGuard::try_acquire(&state.run_active) else {
        state
            .hub
            .broadcast("⚠️ Start rejected: a run is already in progress.");
        return Err(AppError::Conflict("a run is already in progress".to_string()));
    };

    state.hub.broadcast("⚙️ Automation triggered...");

    let AppState {
        hub, config, llm, ..
    } = state;
    tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = pipeline::run(hub.clone(), config, llm).await {
            hub.broadcast(format!("❌ Fatal error: {e}"));
        }
    });

    Ok(Json(json!({ "msg": "Automation started" })))
}
