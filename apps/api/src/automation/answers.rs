//! Answer selection for application form fields.
//!
//! Precedence per field: AI-generated answer (when available) → pattern
//! override keyed on the field's placeholder/name → canned default
//! paragraph. The AI path is best-effort; an unusable response falls back
//! to the canned answers without failing the link.

use std::collections::HashMap;

use crate::browser::{FieldValue, FormField};
use crate::llm_client::prompts::ANSWER_PROMPT_TEMPLATE;

/// Canned paragraph used when nothing better matches.
pub const DEFAULT_ANSWER: &str =
    "I am a dedicated and passionate learner with hands-on experience in full \
     stack development. I always strive to deliver quality work efficiently.";

const SAMPLE_WORK_URL: &str = "https://github.com/ankitdev";
const WHY_HIRE_ANSWER: &str =
    "Because I have the right skills, attitude, and enthusiasm to excel in this role.";

/// Pattern override keyed on the field's placeholder or name attribute.
pub fn override_for(placeholder: &str, name: &str) -> Option<&'static str> {
    let placeholder = placeholder.to_lowercase();
    let name = name.to_lowercase();
    let mentions = |needle: &str| placeholder.contains(needle) || name.contains(needle);

    if mentions("rate") {
        Some("5")
    } else if mentions("sample") || mentions("portfolio") {
        Some(SAMPLE_WORK_URL)
    } else if mentions("hire") {
        Some(WHY_HIRE_ANSWER)
    } else {
        None
    }
}

/// Resolves a value for every scraped field.
pub fn resolve(
    fields: &[FormField],
    ai_answers: Option<&HashMap<String, String>>,
) -> Vec<FieldValue> {
    fields
        .iter()
        .map(|field| {
            let ai = ai_answers.and_then(|map| lookup(map, field_key(field)));
            let value = match ai {
                Some(answer) => answer.to_string(),
                None => override_for(&field.placeholder, &field.name)
                    .unwrap_or(DEFAULT_ANSWER)
                    .to_string(),
            };
            FieldValue {
                index: field.index,
                value,
            }
        })
        .collect()
}

/// Builds the answer-generation prompt from the scraped fields.
pub fn build_answer_prompt(link: &str, fields: &[FormField]) -> String {
    let field_list = fields
        .iter()
        .map(|f| format!("- \"{}\"", field_key(f)))
        .collect::<Vec<_>>()
        .join("\n");
    ANSWER_PROMPT_TEMPLATE
        .replace("{link}", link)
        .replace("{fields}", &field_list)
}

/// Best label for matching a field against an AI answer map.
fn field_key(field: &FormField) -> &str {
    if !field.label.is_empty() {
        &field.label
    } else if !field.placeholder.is_empty() {
        &field.placeholder
    } else {
        &field.name
    }
}

/// Case-insensitive, trimmed lookup — models rarely echo labels verbatim.
fn lookup<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    let wanted = key.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    map.iter()
        .find(|(k, _)| k.trim().to_lowercase() == wanted)
        .map(|(_, v)| v.as_str())
}
