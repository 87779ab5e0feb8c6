//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::completion::message::{AssistantContent, Message};

use super::provider::{ChatMessage, CompletionRequest, CompletionResponse, JsonSchemaFormat, LlmProvider, Role};
use crate::error::LlmError;

/// Output cap used when a request leaves `max_tokens` unset.
const DEFAULT_MAX_TOKENS: u64 = 2048;

/// How a backend is asked for schema-constrained JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredOutput {
    /// OpenAI Responses API `text.format` request parameter.
    TextFormat,
    /// No request parameter; the schema is appended to the preamble.
    Preamble,
}

/// Wraps a rig completion model as an `LlmProvider`.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
    structured_output: StructuredOutput,
}

impl<M> RigAdapter<M> {
    pub fn new(provider: &'static str, model: M, model_name: &str, structured_output: StructuredOutput) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
            structured_output,
        }
    }
}

/// Request split into rig's shape.
#[derive(Debug)]
struct RigParts {
    preamble: Option<String>,
    history: Vec<Message>,
    prompt: Message,
}

fn to_rig_message(message: &ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content.clone()),
        Role::User | Role::System => Message::user(message.content.clone()),
    }
}

/// System messages become the preamble; the last remaining message is the prompt.
fn split_request(provider: &str, request: &CompletionRequest) -> Result<RigParts, LlmError> {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let mut history: Vec<Message> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(to_rig_message)
        .collect();

    let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: "request has no conversation messages".to_string(),
    })?;

    Ok(RigParts {
        preamble: (!system.is_empty()).then(|| system.join("\n\n")),
        history,
        prompt,
    })
}

fn text_format_params(format: &JsonSchemaFormat) -> serde_json::Value {
    serde_json::json!({
        "text": {
            "format": {
                "type": "json_schema",
                "name": format.name,
                "schema": format.schema,
                "strict": false,
            }
        }
    })
}

fn schema_instruction(format: &JsonSchemaFormat) -> String {
    format!(
        "Respond with a single JSON object matching this schema and nothing else:\n{}",
        format.schema
    )
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let RigParts {
            mut preamble,
            history,
            prompt,
        } = split_request(self.provider, &request)?;

        let mut additional_params = None;
        if let Some(ref format) = request.response_format {
            match self.structured_output {
                StructuredOutput::TextFormat => additional_params = Some(text_format_params(format)),
                StructuredOutput::Preamble => {
                    let instruction = schema_instruction(format);
                    preamble = Some(match preamble {
                        Some(p) => format!("{p}\n\n{instruction}"),
                        None => instruction,
                    });
                }
            }
        }

        let mut builder = self
            .model
            .completion_request(prompt)
            .messages(history)
            .max_tokens(request.max_tokens.map(u64::from).unwrap_or(DEFAULT_MAX_TOKENS));
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(params) = additional_params {
            builder = builder.additional_params(params);
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: e.to_string(),
        })?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "response contained no text".to_string(),
            });
        }

        tracing::debug!(
            model = %self.model_name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion finished"
        );

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}
