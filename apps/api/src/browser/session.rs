//! chromiumoxide-backed implementation of `PageDriver`.
//!
//! One `BrowserSession` owns one Chromium process, one page, and the tokio
//! task that drives the CDP message loop. Each pipeline run launches its
//! own session and tears it down at the end.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::Config;

use super::{BrowserError, FieldValue, FormField, PageDriver};

/// Delay between keystrokes when typing credentials, mimicking a human.
const KEYSTROKE_DELAY: Duration = Duration::from_millis(20);
/// Poll interval for `wait_visible`.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// CSS selector covering every field the auto-fill step touches.
const FILLABLE_FIELDS: &str =
    "input[type='text'], input[type='number'], input[type='email'], textarea";

pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launches a Chromium instance and opens a blank page.
    ///
    /// Headed unless configured otherwise, since CAPTCHA solving is left
    /// to a human watching the window.
    pub async fn launch(config: &Config) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .args(vec!["--no-sandbox", "--disable-setuid-sandbox"]);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path.as_str());
        }
        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // Drive the CDP message loop for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        debug!("browser session launched (headless: {})", config.headless);

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Closes the browser and stops the CDP loop. Failures here are logged
    /// and swallowed; the run outcome was decided before teardown.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {e}");
        }
        self.handler_task.abort();
    }

    /// Runs `js` on the live page and deserializes its return value.
    async fn eval_json<T: DeserializeOwned>(&self, js: String) -> Result<T, BrowserError> {
        self.page
            .evaluate(js)
            .await?
            .into_value::<T>()
            .map_err(|e| BrowserError::Eval(e.to_string()))
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    type Control = Element;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn wait_visible(&self, css: &str, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(css).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::WaitTimeout {
                    selector: css.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn type_slowly(&self, css: &str, text: &str) -> Result<(), BrowserError> {
        let field = self.page.find_element(css).await?;
        field.click().await?; // focus the field the way a user would
        for ch in text.chars() {
            field.type_str(ch.to_string()).await?;
            sleep(KEYSTROKE_DELAY).await;
        }
        Ok(())
    }

    async fn click(&self, css: &str) -> Result<(), BrowserError> {
        let element = self.page.find_element(css).await?;
        element.click().await?;
        Ok(())
    }

    async fn query(&self, css: &str) -> Result<Option<Element>, BrowserError> {
        // An absent selector surfaces as a CDP error; treat it as not-found.
        Ok(self.page.find_element(css).await.ok())
    }

    async fn buttons(&self) -> Result<Vec<Element>, BrowserError> {
        Ok(self.page.find_elements("button").await.unwrap_or_default())
    }

    async fn control_text(&self, control: &Element) -> Result<String, BrowserError> {
        Ok(control.inner_text().await?.unwrap_or_default())
    }

    async fn click_control(&self, control: &Element) -> Result<(), BrowserError> {
        control.click().await?;
        Ok(())
    }

    async fn scrape_hrefs(&self, css: &str) -> Result<Vec<String>, BrowserError> {
        let js = format!(
            "(() => Array.from(document.querySelectorAll({css:?})).map((el) => el.href))()"
        );
        self.eval_json(js).await
    }

    async fn form_fields(&self) -> Result<Vec<FormField>, BrowserError> {
        let js = format!(
            r#"(() => {{
                return Array.from(document.querySelectorAll({FILLABLE_FIELDS:?})).map((el, index) => ({{
                    index,
                    placeholder: el.placeholder || "",
                    name: el.name || "",
                    label: ((el.labels && el.labels.length) ? el.labels[0].innerText : "").trim(),
                }}));
            }})()"#
        );
        self.eval_json(js).await
    }

    async fn fill_fields(&self, values: &[FieldValue]) -> Result<usize, BrowserError> {
        let payload =
            serde_json::to_string(values).map_err(|e| BrowserError::Eval(e.to_string()))?;
        let js = format!(
            r#"(() => {{
                const values = {payload};
                const fields = Array.from(document.querySelectorAll({FILLABLE_FIELDS:?}));
                let written = 0;
                for (const {{ index, value }} of values) {{
                    const el = fields[index];
                    if (!el) continue;
                    el.focus();
                    el.value = value;
                    el.dispatchEvent(new Event("input", {{ bubbles: true }}));
                    written += 1;
                }}
                return written;
            }})()"#
        );
        self.eval_json(js).await
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }
}
