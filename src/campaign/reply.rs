//! Structured AI reply contract — schema, parsing, and shape checks.

use serde::{Deserialize, Deserializer};

use crate::error::CampaignError;

/// Name under which the reply schema is sent to the provider.
pub const REPLY_SCHEMA_NAME: &str = "campaign_builder_reply";

/// Placeholder strings models emit instead of leaving a field out.
const SENTINELS: [&str; 9] = [
    "null", "none", "n/a", "na", "unknown", "-", "tbd", "pending", "not provided",
];

/// One parsed AI turn.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AiReply {
    pub ai_response: String,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub icp: Option<IcpUpdate>,
    #[serde(default)]
    pub company: Option<CompanyUpdate>,
    #[serde(default)]
    pub data_source: Option<DataSourceUpdate>,
    #[serde(default)]
    pub cadence: Option<CadenceUpdate>,
    #[serde(default)]
    pub mailbox_selection: Option<Vec<String>>,
    #[serde(default)]
    pub launch_ready: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IcpUpdate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub goal: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanyUpdate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value_prop: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pain_points: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataSourceUpdate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub source_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CadenceUpdate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub channels: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub steps: Option<String>,
}

/// Accept strings, numbers, booleans or null; drop blanks and sentinels.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    };
    Ok(clean_value(text))
}

/// Trim a value and treat blanks and sentinel placeholders as absent.
pub fn clean_value(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() || SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
        None
    } else {
        Some(trimmed)
    }
}

/// Parse a raw model reply into an `AiReply`.
///
/// Tolerates markdown fences around the object. Rejects payloads that are
/// not JSON objects or carry no `ai_response` text.
pub fn parse_ai_reply(raw: &str) -> Result<AiReply, CampaignError> {
    let json_str = extract_json_object(raw);
    let mut reply: AiReply = serde_json::from_str(&json_str)
        .map_err(|e| CampaignError::ReplyRejected(format!("JSON parse error: {e}")))?;

    if reply.ai_response.trim().is_empty() {
        return Err(CampaignError::ReplyRejected(
            "ai_response is missing or empty".to_string(),
        ));
    }

    reply.suggested_actions = reply
        .suggested_actions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(selection) = reply.mailbox_selection.as_mut() {
        selection.retain(|s| !s.trim().is_empty());
    }

    Ok(reply)
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

/// JSON schema the provider must honour for every builder turn.
pub fn reply_schema() -> serde_json::Value {
    let nullable_string = serde_json::json!({"type": ["string", "null"]});
    serde_json::json!({
        "type": "object",
        "properties": {
            "ai_response": {"type": "string"},
            "suggested_actions": {
                "type": "array",
                "items": {"type": "string"},
                "maxItems": 3
            },
            "icp": {
                "type": "object",
                "properties": {
                    "role": nullable_string,
                    "industry": nullable_string,
                    "location": nullable_string,
                    "goal": nullable_string
                }
            },
            "company": {
                "type": "object",
                "properties": {
                    "url": nullable_string,
                    "value_prop": nullable_string,
                    "pain_points": nullable_string
                }
            },
            "data_source": {
                "type": "object",
                "properties": {
                    "source_type": nullable_string,
                    "status": nullable_string
                }
            },
            "cadence": {
                "type": "object",
                "properties": {
                    "channels": nullable_string,
                    "steps": nullable_string
                }
            },
            "mailbox_selection": {
                "type": "array",
                "items": {"type": "string"}
            },
            "launch_ready": {"type": "boolean"}
        },
        "required": ["ai_response", "suggested_actions"]
    })
}
