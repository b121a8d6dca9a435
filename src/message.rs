//! # Queue Message Contract
//!
//! The front-end enqueues one JSON object per form submission:
//!
//! ```json
//! {"name": "Ana", "phoneModel": "Pixel 4 XL", "ip": "10.0.0.5"}
//! ```
//!
//! The catch-all route enqueues `requestId`, `method`, `path` and
//! `timestamp` instead. Every field is optional here: a missing, `null` or
//! blank field is printed as a placeholder rather than rejected, and unknown
//! fields are ignored. Only a body that is not a JSON object is malformed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{PaperTrailError, Result};

/// One dequeued submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMessage {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub phone_model: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl SubmissionMessage {
    /// Parse a queue message body.
    ///
    /// ```
    /// use paper_trail::message::SubmissionMessage;
    ///
    /// let msg = SubmissionMessage::from_json(r#"{"name":"Ana","extra":1}"#)?;
    /// assert_eq!(msg.name.as_deref(), Some("Ana"));
    /// assert_eq!(msg.ip, None);
    /// # Ok::<(), paper_trail::PaperTrailError>(())
    /// ```
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| PaperTrailError::MalformedMessage(format!("invalid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(PaperTrailError::MalformedMessage(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| PaperTrailError::MalformedMessage(e.to_string()))
    }

    /// Whether this came from the catch-all route.
    pub fn has_request_details(&self) -> bool {
        self.request_id.is_some()
            || self.method.is_some()
            || self.path.is_some()
            || self.timestamp.is_some()
    }
}

/// Accept strings, numbers and booleans; anything blank or structured is absent.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        _ => None,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
