//! The sequential automation pipeline: authenticate, discover postings,
//! apply to each. One invocation is one "run" against one dedicated
//! browser session; phases and per-link iterations execute in strict
//! program order.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::browser::{BrowserError, BrowserSession, FormField, PageDriver};
use crate::config::{Config, Credentials};
use crate::llm_client::{prompts, LlmClient};
use crate::logs::LogHub;

use super::answers;
use super::selectors::{self, APPLY_TRIGGER, SUBMIT_TRIGGER};

const LOGIN_FIELD_WAIT: Duration = Duration::from_secs(10);
const LOGIN_CONFIRM_WAIT: Duration = Duration::from_secs(45);
const LISTING_WAIT: Duration = Duration::from_secs(15);
const FORM_WAIT: Duration = Duration::from_secs(8);
/// Settle time after navigations and clicks before touching the DOM.
const SETTLE_DELAY: Duration = Duration::from_millis(1500);
/// Pacing between links to avoid tripping anti-automation defenses.
const LINK_PACING: Duration = Duration::from_secs(2);
const MAX_LINKS: usize = 20;

const LISTING_CONTAINER: &str = "#internship_list_container_1, .internship_list_container";
const POSTING_ANCHORS: &str = "a[href*='/internship/detail/'], a[href*='/internship/']";
const FORM_MARKERS: &str = "form, #apply_form, .applyModal, input, textarea, select";

/// A failure that aborts the current run. Never fatal to the server: the
/// spawning task logs it and the control surface stays up.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("EMAIL or PASSWORD not set in environment")]
    MissingCredentials,

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Outcome of one posting. Both the log line and the continue/skip
/// decision derive from this, so they can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Submitted,
    /// A form was filled but no submit control was found.
    SubmitMissing,
    /// No apply trigger on the page — already applied or unavailable.
    ApplyMissing,
    /// Something broke mid-link; the next link still proceeds.
    Failed(String),
}

impl LinkOutcome {
    pub fn log_line(&self) -> String {
        match self {
            LinkOutcome::Submitted => {
                "✅ Attempted to submit (may require confirmation).".to_string()
            }
            LinkOutcome::SubmitMissing => {
                "⚠️ Could not find a submit button; please check manually.".to_string()
            }
            LinkOutcome::ApplyMissing => {
                "⚠️ Apply button not found or already applied.".to_string()
            }
            LinkOutcome::Failed(reason) => format!("❌ Error while applying: {reason}"),
        }
    }
}

/// Launches a dedicated browser session and drives one full run.
///
/// Credentials are checked before anything else: a missing credential is
/// fatal to the run but must not cost a browser launch or any navigation.
pub async fn run(hub: LogHub, config: Config, llm: Option<LlmClient>) -> Result<(), RunError> {
    let credentials = config.credentials().ok_or(RunError::MissingCredentials)?;

    let session = BrowserSession::launch(&config).await?;
    let result = drive(&session, &hub, &config, &credentials, llm.as_ref()).await;
    session.close().await;
    result
}

/// The three phases against an already-launched driver. Separated from
/// `run` so tests can substitute a scripted driver.
async fn drive<D: PageDriver>(
    driver: &D,
    hub: &LogHub,
    config: &Config,
    credentials: &Credentials,
    llm: Option<&LlmClient>,
) -> Result<(), RunError> {
    login(driver, hub, config, credentials).await?;

    let links = discover(driver, hub, config).await?;
    for link in &links {
        let outcome = apply_to_posting(driver, hub, llm, link).await;
        hub.broadcast(outcome.log_line());
        sleep(LINK_PACING).await;
    }

    hub.broadcast("🎯 Finished processing internships.");
    Ok(())
}

async fn login<D: PageDriver>(
    driver: &D,
    hub: &LogHub,
    config: &Config,
    credentials: &Credentials,
) -> Result<(), RunError> {
    hub.broadcast("🔐 Navigating to login...");
    driver
        .goto(&format!("{}/login/student", config.portal_url))
        .await?;

    driver.wait_visible("#email", LOGIN_FIELD_WAIT).await?;
    driver.type_slowly("#email", &credentials.email).await?;
    sleep(Duration::from_millis(500)).await;
    driver.type_slowly("#password", &credentials.password).await?;
    sleep(Duration::from_millis(800)).await;
    driver.click("#login_submit").await?;

    hub.broadcast("⚠️ If CAPTCHA appears, complete it manually.");
    if !left_login_screen(driver).await {
        hub.broadcast("⚠️ Waiting for manual login verification if captcha was shown.");
    }

    hub.broadcast("✅ Login step finished.");
    Ok(())
}

/// Polls until the page navigates away from the login screen or the
/// bounded wait expires. Timing out is not a failure: a human may still be
/// solving a CAPTCHA, and discovery will surface a real login failure as
/// zero links.
async fn left_login_screen<D: PageDriver>(driver: &D) -> bool {
    let deadline = Instant::now() + LOGIN_CONFIRM_WAIT;
    while Instant::now() < deadline {
        if let Ok(url) = driver.current_url().await {
            if !url.is_empty() && !url.contains("/login") {
                return true;
            }
        }
        sleep(Duration::from_secs(1)).await;
    }
    false
}

async fn discover<D: PageDriver>(
    driver: &D,
    hub: &LogHub,
    config: &Config,
) -> Result<Vec<String>, RunError> {
    hub.broadcast("🔎 Fetching internships...");
    driver
        .goto(&format!(
            "{}/internships/matching-preferences/",
            config.portal_url
        ))
        .await?;

    if driver.wait_visible(LISTING_CONTAINER, LISTING_WAIT).await.is_err() {
        hub.broadcast("⚠️ Internship list container not found.");
    }
    sleep(SETTLE_DELAY).await;

    let raw = driver.scrape_hrefs(POSTING_ANCHORS).await?;
    let links = dedupe_and_cap(raw, MAX_LINKS);
    hub.broadcast(format!(
        "✅ Found {} internship links (top {MAX_LINKS} selected).",
        links.len()
    ));
    Ok(links)
}

/// Deduplicates by URL preserving first-seen order, then truncates.
fn dedupe_and_cap(raw: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut links: Vec<String> = raw.into_iter().filter(|l| seen.insert(l.clone())).collect();
    links.truncate(cap);
    links
}

/// One posting, independently recoverable: every error inside is folded
/// into a `LinkOutcome` so the loop in `drive` never aborts early.
async fn apply_to_posting<D: PageDriver>(
    driver: &D,
    hub: &LogHub,
    llm: Option<&LlmClient>,
    link: &str,
) -> LinkOutcome {
    hub.broadcast(format!("🚀 Opening: {link}"));
    match try_apply(driver, hub, llm, link).await {
        Ok(outcome) => outcome,
        Err(e) => LinkOutcome::Failed(e.to_string()),
    }
}

async fn try_apply<D: PageDriver>(
    driver: &D,
    hub: &LogHub,
    llm: Option<&LlmClient>,
    link: &str,
) -> Result<LinkOutcome, BrowserError> {
    driver.goto(link).await?;

    let Some(apply) = selectors::locate(driver, APPLY_TRIGGER).await? else {
        return Ok(LinkOutcome::ApplyMissing);
    };
    driver.click_control(&apply).await?;
    hub.broadcast("➡️ Clicked apply button. Waiting for form/modal...");

    if driver.wait_visible(FORM_MARKERS, FORM_WAIT).await.is_err() {
        hub.broadcast("⚠️ Form didn't appear quickly.");
    }
    sleep(SETTLE_DELAY).await;

    fill_form(driver, hub, llm, link).await?;
    sleep(SETTLE_DELAY).await;

    match selectors::locate(driver, SUBMIT_TRIGGER).await? {
        Some(submit) => {
            driver.click_control(&submit).await?;
            Ok(LinkOutcome::Submitted)
        }
        None => Ok(LinkOutcome::SubmitMissing),
    }
}

async fn fill_form<D: PageDriver>(
    driver: &D,
    hub: &LogHub,
    llm: Option<&LlmClient>,
    link: &str,
) -> Result<(), BrowserError> {
    let fields = driver.form_fields().await?;
    if fields.is_empty() {
        hub.broadcast("⚠️ No fillable fields found on the form.");
        return Ok(());
    }

    let ai_answers = match llm {
        Some(client) => generate_answers(client, hub, link, &fields).await,
        None => None,
    };

    let values = answers::resolve(&fields, ai_answers.as_ref());
    driver.fill_fields(&values).await?;
    hub.broadcast("✅ Auto-filled input fields and textareas successfully.");
    Ok(())
}

/// AI answers are best-effort: any HTTP or parse failure falls back to the
/// canned answers and only costs a warning line.
async fn generate_answers(
    client: &LlmClient,
    hub: &LogHub,
    link: &str,
    fields: &[FormField],
) -> Option<HashMap<String, String>> {
    let prompt = answers::build_answer_prompt(link, fields);
    match client
        .call_json::<HashMap<String, String>>(&prompt, prompts::ANSWER_SYSTEM)
        .await
    {
        Ok(map) if !map.is_empty() => {
            hub.broadcast("🪄 Using AI-generated answers for this form.");
            Some(map)
        }
        Ok(_) => {
            hub.broadcast("⚠️ AI returned no answers; using canned answers.");
            None
        }
        Err(e) => {
            hub.broadcast(format!(
                "⚠️ AI answer generation failed ({e}); using canned answers."
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::FieldValue;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted driver: answers queries from a fixed scenario and records
    /// every navigation/click for assertions.
    struct FakeDriver {
        hrefs: Vec<String>,
        has_apply_trigger: bool,
        has_submit_trigger: bool,
        /// Link whose navigation blows up, simulating a mid-link failure.
        fail_goto_for: Option<String>,
        actions: Mutex<Vec<String>>,
    }

    impl FakeDriver {
        fn new(hrefs: &[&str]) -> Self {
            Self {
                hrefs: hrefs.iter().map(|s| s.to_string()).collect(),
                has_apply_trigger: true,
                has_submit_trigger: true,
                fail_goto_for: None,
                actions: Mutex::new(Vec::new()),
            }
        }

        fn actions(&self) -> Vec<String> {
            self.actions.lock().unwrap().clone()
        }

        fn record(&self, action: String) {
            self.actions.lock().unwrap().push(action);
        }
    }

    #[async_trait]
    impl PageDriver for FakeDriver {
        type Control = String;

        async fn goto(&self, url: &str) -> Result<(), BrowserError> {
            if self.fail_goto_for.as_deref() == Some(url) {
                return Err(BrowserError::Launch("connection reset".to_string()));
            }
            self.record(format!("goto {url}"));
            Ok(())
        }

        async fn wait_visible(&self, _css: &str, _timeout: Duration) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn type_slowly(&self, css: &str, _text: &str) -> Result<(), BrowserError> {
            self.record(format!("type {css}"));
            Ok(())
        }

        async fn click(&self, css: &str) -> Result<(), BrowserError> {
            self.record(format!("click {css}"));
            Ok(())
        }

        async fn query(&self, css: &str) -> Result<Option<String>, BrowserError> {
            let present = match css {
                "#easy_apply_button" => self.has_apply_trigger,
                "button[type='submit']" => self.has_submit_trigger,
                _ => false,
            };
            Ok(present.then(|| css.to_string()))
        }

        async fn buttons(&self) -> Result<Vec<String>, BrowserError> {
            Ok(Vec::new())
        }

        async fn control_text(&self, control: &String) -> Result<String, BrowserError> {
            Ok(control.clone())
        }

        async fn click_control(&self, control: &String) -> Result<(), BrowserError> {
            self.record(format!("click {control}"));
            Ok(())
        }

        async fn scrape_hrefs(&self, _css: &str) -> Result<Vec<String>, BrowserError> {
            Ok(self.hrefs.clone())
        }

        async fn form_fields(&self) -> Result<Vec<FormField>, BrowserError> {
            Ok(vec![FormField {
                index: 0,
                placeholder: "Why should we hire you?".to_string(),
                name: String::new(),
                label: String::new(),
            }])
        }

        async fn fill_fields(&self, values: &[FieldValue]) -> Result<usize, BrowserError> {
            self.record(format!("fill {}", values.len()));
            Ok(values.len())
        }

        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok("https://internshala.com/student/dashboard".to_string())
        }
    }

    fn test_config() -> Config {
        Config {
            email: Some("user@example.com".to_string()),
            password: Some("hunter2".to_string()),
            anthropic_api_key: None,
            port: 5000,
            frontend_origin: "http://localhost:5173".to_string(),
            portal_url: "https://internshala.com".to_string(),
            headless: true,
            chrome_path: None,
            rust_log: "info".to_string(),
        }
    }

    fn test_credentials() -> Credentials {
        Credentials {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_dedupe_preserves_first_seen_order_and_caps() {
        let raw: Vec<String> = ["a", "b", "a", "c", "b", "d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(dedupe_and_cap(raw, 3), vec!["a", "b", "c"]);

        let many: Vec<String> = (0..50).map(|i| format!("link-{i}")).collect();
        assert_eq!(dedupe_and_cap(many, MAX_LINKS).len(), MAX_LINKS);
    }

    #[test]
    fn test_outcome_lines_carry_severity_markers() {
        assert!(LinkOutcome::Submitted.log_line().starts_with('✅'));
        assert!(LinkOutcome::SubmitMissing.log_line().starts_with('⚠'));
        assert!(LinkOutcome::ApplyMissing.log_line().starts_with('⚠'));
        assert!(LinkOutcome::Failed("boom".to_string())
            .log_line()
            .contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_links_logs_count_and_summary_without_applying() {
        let driver = FakeDriver::new(&[]);
        let hub = LogHub::new();
        let mut rx = hub.register();

        drive(&driver, &hub, &test_config(), &test_credentials(), None)
            .await
            .unwrap();

        let lines = drain(&mut rx);
        assert!(lines.iter().any(|l| l.contains("Found 0 internship links")));
        assert!(lines.iter().any(|l| l.contains("Finished processing")));
        assert!(!lines.iter().any(|l| l.contains("Opening:")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_link_failure_does_not_abort_remaining_links() {
        let bad = "https://internshala.com/internship/detail/bad";
        let good = "https://internshala.com/internship/detail/good";
        let mut driver = FakeDriver::new(&[bad, good]);
        driver.fail_goto_for = Some(bad.to_string());
        let hub = LogHub::new();
        let mut rx = hub.register();

        drive(&driver, &hub, &test_config(), &test_credentials(), None)
            .await
            .unwrap();

        let lines = drain(&mut rx);
        // Both links were attempted despite the first one failing.
        assert_eq!(lines.iter().filter(|l| l.contains("Opening:")).count(), 2);
        assert!(lines.iter().any(|l| l.contains("❌ Error while applying")));
        assert!(lines
            .iter()
            .any(|l| l.contains("Attempted to submit")));
        assert!(driver.actions().iter().any(|a| a == &format!("goto {good}")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_apply_trigger_skips_link_and_proceeds() {
        let mut driver = FakeDriver::new(&[
            "https://internshala.com/internship/detail/one",
            "https://internshala.com/internship/detail/two",
        ]);
        driver.has_apply_trigger = false;
        let hub = LogHub::new();
        let mut rx = hub.register();

        drive(&driver, &hub, &test_config(), &test_credentials(), None)
            .await
            .unwrap();

        let lines = drain(&mut rx);
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.contains("Apply button not found"))
                .count(),
            2
        );
        assert!(lines.iter().any(|l| l.contains("Finished processing")));
        // No form was ever filled.
        assert!(!driver.actions().iter().any(|a| a.starts_with("fill")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_submit_leaves_posting_unsubmitted() {
        let mut driver =
            FakeDriver::new(&["https://internshala.com/internship/detail/one"]);
        driver.has_submit_trigger = false;
        let hub = LogHub::new();
        let mut rx = hub.register();

        drive(&driver, &hub, &test_config(), &test_credentials(), None)
            .await
            .unwrap();

        let lines = drain(&mut rx);
        assert!(lines
            .iter()
            .any(|l| l.contains("Could not find a submit button")));
        // The form was still filled before the submit hunt gave up.
        assert!(driver.actions().iter().any(|a| a.starts_with("fill")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_types_credentials_before_submitting() {
        let driver = FakeDriver::new(&[]);
        let hub = LogHub::new();

        drive(&driver, &hub, &test_config(), &test_credentials(), None)
            .await
            .unwrap();

        let actions = driver.actions();
        let type_email = actions.iter().position(|a| a == "type #email").unwrap();
        let type_password = actions.iter().position(|a| a == "type #password").unwrap();
        let submit = actions
            .iter()
            .position(|a| a == "click #login_submit")
            .unwrap();
        assert!(type_email < type_password && type_password < submit);
    }

    #[tokio::test]
    async fn test_missing_credentials_aborts_before_any_navigation() {
        let hub = LogHub::new();
        let mut config = test_config();
        config.email = None;

        // Fails before a browser is ever launched.
        let err = run(hub, config, None).await.unwrap_err();
        assert!(matches!(err, RunError::MissingCredentials));
        assert!(err.to_string().contains("EMAIL or PASSWORD"));
    }
}
