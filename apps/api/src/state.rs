use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::logs::LogHub;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Fan-out hub for pipeline log lines; cloned into the run task and
    /// every SSE subscription.
    pub hub: LogHub,
    pub config: Config,
    /// AI answer generation is optional; present only when ANTHROPIC_API_KEY is set.
    pub llm: Option<LlmClient>,
    /// Claimed by `/api/start` so two runs never share a browser.
    pub run_active: Arc<AtomicBool>,
}
