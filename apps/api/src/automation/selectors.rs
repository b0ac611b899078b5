//! Ordered locator strategies for the apply and submit controls.
//!
//! Kept as plain data evaluated first-match-wins, rather than nested
//! branching, so the fallback order is obvious and testable.

use crate::browser::{BrowserError, PageDriver};

/// One way of locating a clickable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// CSS selector; first match wins.
    Css(&'static str),
    /// Case-insensitive substring scan over the text of every button.
    ButtonText(&'static str),
}

/// Locator chain for the apply trigger on a posting page.
pub const APPLY_TRIGGER: &[Strategy] = &[
    Strategy::Css("#easy_apply_button"),
    Strategy::Css("button#easy_apply_button"),
    Strategy::Css("button.apply_btn, .apply_btn"),
    Strategy::ButtonText("apply"),
];

/// Locator chain for the submit control inside the application form.
pub const SUBMIT_TRIGGER: &[Strategy] = &[
    Strategy::Css("button[type='submit']"),
    Strategy::Css("#submit"),
    Strategy::Css("button.apply_submit, .apply-submit"),
    Strategy::ButtonText("submit"),
    Strategy::ButtonText("apply"),
];

/// True when a button's visible text satisfies a `ButtonText` strategy.
pub fn text_matches(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(needle)
}

/// Evaluates `strategies` in order and returns the first control found.
/// `None` means no strategy matched anything on the current page.
pub async fn locate<D: PageDriver>(
    driver: &D,
    strategies: &[Strategy],
) -> Result<Option<D::Control>, BrowserError> {
    for strategy in strategies {
        match strategy {
            Strategy::Css(css) => {
                if let Some(control) = driver.query(css).await? {
                    return Ok(Some(control));
                }
            }
            Strategy::ButtonText(needle) => {
                for button in driver.buttons().await? {
                    if text_matches(&driver.control_text(&button).await?, needle) {
                        return Ok(Some(button));
                    }
                }
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_chain_tries_ids_before_text_scan() {
        assert_eq!(APPLY_TRIGGER[0], Strategy::Css("#easy_apply_button"));
        assert_eq!(
            *APPLY_TRIGGER.last().unwrap(),
            Strategy::ButtonText("apply")
        );
    }

    #[test]
    fn test_submit_chain_accepts_apply_labelled_buttons_last() {
        // Some portals label the in-form submit "Apply"; it must rank below
        // an explicit "submit" match.
        let texts: Vec<_> = SUBMIT_TRIGGER
            .iter()
            .filter_map(|s| match s {
                Strategy::ButtonText(t) => Some(*t),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["submit", "apply"]);
    }

    #[test]
    fn test_text_matches_is_case_insensitive() {
        assert!(text_matches("Easy Apply Now", "apply"));
        assert!(text_matches("SUBMIT APPLICATION", "submit"));
        assert!(!text_matches("Save for later", "apply"));
    }
}
