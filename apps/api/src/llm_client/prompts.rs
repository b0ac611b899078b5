// Prompt constants for AI answer generation.

/// System prompt — enforces JSON-only output so `call_json` can parse it.
pub const ANSWER_SYSTEM: &str =
    "You are helping a candidate fill out an internship application form. \
    Write short, professional, first-person answers. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Answer prompt template. Replace `{link}` and `{fields}` before sending.
pub const ANSWER_PROMPT_TEMPLATE: &str = r#"A candidate is applying to the internship posting at:
{link}

The application form asks the following questions (one per line):
{fields}

Return a JSON object mapping each question EXACTLY as written above to a
short answer string (1-3 sentences, or a single number/URL where that is
clearly what the question wants). Example shape:
{"Why should we hire you?": "Because ...", "Your hourly rate": "5"}

Answer every question. Do not add keys that were not asked."#;
