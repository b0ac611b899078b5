use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Portal credentials and the Anthropic key are optional at startup: a run
/// that needs a missing credential is aborted and logged, but the server
/// itself keeps serving (see `automation::pipeline`).
#[derive(Debug, Clone)]
pub struct Config {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Enables AI answer generation for application forms when set.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub frontend_origin: String,
    /// Base URL of the internship portal, without a trailing slash.
    pub portal_url: String,
    /// Headed by default so a human can solve CAPTCHAs mid-run.
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            email: optional_env("EMAIL"),
            password: optional_env("PASSWORD"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            frontend_origin: std::env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            portal_url: std::env::var("PORTAL_URL")
                .unwrap_or_else(|_| "https://internshala.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            headless: std::env::var("HEADLESS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            chrome_path: optional_env("CHROME_PATH"),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Login credentials, present only when both halves are configured
    /// and non-empty.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some(Credentials {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Portal login credentials. Required per-run, not per-process.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
