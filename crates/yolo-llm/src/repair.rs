//! Structured output for backends that cannot bind a function: ask for bare
//! JSON, and give the model one chance to fix output that does not parse.

use crate::error::CompletionError;
use crate::schema::Schema;
use crate::Result;
use serde_json::Value;

pub(crate) fn structured_via_json<F>(
    complete: F,
    system: &str,
    user: &str,
    schema: &Schema,
    function_name: &str,
) -> Result<Value>
where
    F: Fn(&str, &str) -> Result<String>,
{
    let schema_text = serde_json::to_string_pretty(&schema.to_value())?;
    let system = format!(
        "{system}\n\nRespond with a single JSON object holding the arguments for \
         `{function_name}`. It must match this JSON schema:\n{schema_text}\n\
         Output the JSON object only, with no prose and no code fences."
    );

    let first = complete(&system, user)?;
    let reason = match parse_against(schema, &first) {
        Ok(value) => return Ok(value),
        Err(reason) => reason,
    };
    tracing::debug!(function = function_name, %reason, "structured reply rejected, asking for a repair");

    let repair = format!(
        "Your previous reply could not be used: {reason}\n\n\
         Previous reply:\n{first}\n\n\
         Return only the corrected JSON object."
    );
    let second = complete(&system, &repair)?;
    parse_against(schema, &second).map_err(|reason| CompletionError::shape(function_name, reason))
}

fn parse_against(schema: &Schema, text: &str) -> std::result::Result<Value, String> {
    let candidate = extract_json(text);
    let value: Value = serde_json::from_str(candidate).map_err(|e| format!("invalid JSON: {e}"))?;
    schema.validate(&value)?;
    Ok(value)
}

/// Strip code fences and surrounding prose, keeping the outermost `{...}`.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
