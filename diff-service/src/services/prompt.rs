//! Diff prompt construction and model output cleaning.

use serde_json::Value;

pub const CONTENT1_PLACEHOLDER: &str = "{content1}";
pub const CONTENT2_PLACEHOLDER: &str = "{content2}";

/// Built-in prompt. Literal braces are kept as-is; only the two placeholders
/// are substituted.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are an expert JSON comparison agent.
Analyze the two JSON objects below.
Return a JSON object that only describes the differences.
If there are no differences, return an empty JSON object {}.

File 1:
{content1}

File 2:
{content2}

Respond with only the differences - keys and their values - in JSON format. For example:
{
    "key1": "In file1 is: value_for_key1_in_file1, in file2 is: value_for_key1_in_file2",
    "key2": "In file1 is: value_for_key2_in_file1, in file2 is: value_for_key2_in_file2"
}
"#;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// True when `template` can be rendered into a complete prompt.
pub fn has_placeholders(template: &str) -> bool {
    template.contains(CONTENT1_PLACEHOLDER) && template.contains(CONTENT2_PLACEHOLDER)
}

/// Substitute both file contents in a single pass, so placeholder text inside
/// `content1` is never expanded again.
pub fn render_prompt(template: &str, content1: &str, content2: &str) -> String {
    let mut out = String::with_capacity(template.len() + content1.len() + content2.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix(CONTENT1_PLACEHOLDER) {
            out.push_str(content1);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CONTENT2_PLACEHOLDER) {
            out.push_str(content2);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Trim the model output and drop a surrounding ```json fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    let marked_json = trimmed
        .get(..JSON_FENCE.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(JSON_FENCE));
    if !marked_json {
        return trimmed;
    }

    let body = &trimmed[JSON_FENCE.len()..];
    body.strip_suffix(FENCE).unwrap_or(body).trim()
}

/// Parse the model output as JSON. No schema is enforced.
pub fn parse_diff(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}
