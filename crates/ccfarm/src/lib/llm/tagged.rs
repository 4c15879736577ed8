//! # Tagged JSON replies
//!
//! Agents ask the model to wrap its structured answer in a pair of XML-like
//! tags (`<brief_json>{...}</brief_json>`). This module renders those
//! instructions and pulls the JSON object back out of free-form replies.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::Error;

const MAX_CONTENT_PREVIEW: usize = 500;
const MAX_JSON_PREVIEW: usize = 300;

fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        format!("{}...", content.chars().take(max_chars).collect::<String>())
    } else {
        content.to_string()
    }
}

/// Instructions appended to a prompt so that the reply carries `schema`
/// conforming JSON enclosed in `<tag>` tags
pub fn schema_instructions(tag: &str, schema: &str) -> String {
    format!(
        r#"
Return your response in <{tag}> format with valid JSON that conforms to this schema:
```json
{schema}
```

Make sure all required fields are included and properly formatted.
The response must be valid JSON enclosed in <{tag}> tags.
"#,
        schema = schema.trim()
    )
}

/// Appends the schema instructions to `prompt`
pub fn with_schema_instructions(prompt: &str, tag: &str, schema: &str) -> String {
    format!("{}\n\n{}", prompt.trim_end(), schema_instructions(tag, schema))
}

/// Extracts the first JSON object enclosed in `<tag>...</tag>`
pub fn extract_tagged_json(content: &str, tag: &str) -> Result<Map<String, Value>, Error> {
    let pattern = format!(r"(?s)<{tag}>(.*?)</{tag}>", tag = regex::escape(tag));
    let re = Regex::new(&pattern)
        .map_err(|e| Error::ParseError(format!("Invalid tag name '{tag}': {e}")))?;

    let json_str = re
        .captures(content)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| {
            tracing::error!(tag, "Response does not contain expected tags");
            Error::ParseError(format!(
                "Response does not contain <{tag}> tags. Content: {}",
                truncate(content, MAX_CONTENT_PREVIEW)
            ))
        })?;

    match serde_json::from_str::<Value>(json_str) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::ParseError(format!(
            "Parsed JSON is not an object: {}",
            json_type_name(&other)
        ))),
        Err(e) => {
            tracing::error!(error = %e, tag, "Invalid JSON in tagged response");
            Err(Error::ParseError(format!(
                "Invalid JSON in <{tag}> tags: {e}\nContent: {}",
                truncate(json_str, MAX_JSON_PREVIEW)
            )))
        }
    }
}

/// Extracts and deserializes the tagged JSON object into `T`
pub fn parse_tagged<T: DeserializeOwned>(content: &str, tag: &str) -> Result<T, Error> {
    let map = extract_tagged_json(content, tag)?;
    serde_json::from_value(Value::Object(map))
        .map_err(|e| Error::Validation(format!("Reply does not match the expected schema: {e}")))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
