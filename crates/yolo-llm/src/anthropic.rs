use crate::error::CompletionError;
use crate::schema::Schema;
use crate::service::{accept_arguments, CompletionService};
use crate::Result;
use serde::Deserialize;
use serde_json::{json, Value};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Backend for the Anthropic messages API.
pub struct Messages {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl Messages {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn send(&self, body: &Value) -> Result<Vec<ContentBlock>> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(CompletionError::Provider(format!("HTTP {status}: {}", text.trim())));
        }

        let parsed: MessagesResponse = response.json()?;
        if parsed.content.is_empty() {
            return Err(CompletionError::NoResponse);
        }
        Ok(parsed.content)
    }
}

impl CompletionService for Messages {
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": temperature,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });
        let text: Vec<String> = self
            .send(&body)?
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect();
        if text.is_empty() {
            return Err(CompletionError::NoResponse);
        }
        Ok(text.join(""))
    }

    fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema: &Schema,
        function_name: &str,
    ) -> Result<Value> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": [{"role": "user", "content": user}],
            "tools": [{
                "name": function_name,
                "description": schema.description.clone().unwrap_or_default(),
                "input_schema": schema.to_value(),
            }],
            "tool_choice": {"type": "tool", "name": function_name},
        });

        let input = self
            .send(&body)?
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::ToolUse { name, input } if name == function_name => Some(input),
                _ => None,
            })
            .ok_or_else(|| CompletionError::shape(function_name, "the model did not call the tool"))?;
        accept_arguments(schema, function_name, input)
    }
}
