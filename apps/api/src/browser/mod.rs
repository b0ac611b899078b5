//! Browser driver seam.
//!
//! The pipeline talks to the browser through the `PageDriver` trait so it
//! can be exercised against a scripted fake in tests. `BrowserSession` is
//! the production implementation over chromiumoxide (CDP).

pub mod session;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use session::BrowserSession;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    WaitTimeout { selector: String, timeout: Duration },

    #[error("page script returned malformed data: {0}")]
    Eval(String),
}

/// One fillable control scraped from an application form.
#[derive(Debug, Clone, Deserialize)]
pub struct FormField {
    pub index: usize,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
}

/// A value to write into the control at `index`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldValue {
    pub index: usize,
    pub value: String,
}

/// The browser operations the pipeline needs, and nothing more.
///
/// Same seam pattern as a pluggable scorer behind a trait: the production
/// implementation drives a real Chromium over CDP, the test implementation
/// replays a scripted page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Handle to a located element, opaque to the pipeline.
    type Control: Send + Sync;

    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Resolves once `css` matches an element, polling until `timeout`.
    async fn wait_visible(&self, css: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Types into the first match of `css` with a human-like per-keystroke delay.
    async fn type_slowly(&self, css: &str, text: &str) -> Result<(), BrowserError>;

    async fn click(&self, css: &str) -> Result<(), BrowserError>;

    /// First element matching `css`, if any.
    async fn query(&self, css: &str) -> Result<Option<Self::Control>, BrowserError>;

    /// Every button element on the page, in document order.
    async fn buttons(&self) -> Result<Vec<Self::Control>, BrowserError>;

    async fn control_text(&self, control: &Self::Control) -> Result<String, BrowserError>;

    async fn click_control(&self, control: &Self::Control) -> Result<(), BrowserError>;

    /// `href` of every anchor matching `css`, in document order.
    async fn scrape_hrefs(&self, css: &str) -> Result<Vec<String>, BrowserError>;

    /// Descriptors of every fillable text/number/email input and textarea.
    async fn form_fields(&self) -> Result<Vec<FormField>, BrowserError>;

    /// Writes `values` into the matching controls, dispatching a bubbling
    /// `input` event per control so page-side validation reacts as if a
    /// human typed. Returns the number of controls written.
    async fn fill_fields(&self, values: &[FieldValue]) -> Result<usize, BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;
}
