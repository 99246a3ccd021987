use crate::error::CompletionError;
use crate::repair::structured_via_json;
use crate::schema::Schema;
use crate::service::{accept_arguments, CompletionService};
use crate::Result;
use serde::Deserialize;
use serde_json::{json, Value};

/// Backend for the chat-completions dialect (OpenAI, Mistral, compatible servers).
pub struct ChatCompletions {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    tool_calling: bool,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

impl ChatCompletions {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        // No timeout: long plans take as long as the provider needs.
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            tool_calling: true,
        })
    }

    pub fn tool_calling(mut self, enabled: bool) -> Self {
        self.tool_calling = enabled;
        self
    }

    fn send(&self, body: &Value) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(CompletionError::Provider(format!("HTTP {status}: {}", text.trim())));
        }

        let parsed: ChatResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(CompletionError::NoResponse)
    }

    fn messages(system: &str, user: &str) -> Value {
        json!([
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ])
    }
}

impl CompletionService for ChatCompletions {
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": temperature,
            "messages": Self::messages(system, user),
        });
        self.send(&body)?.content.ok_or(CompletionError::NoResponse)
    }

    fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema: &Schema,
        function_name: &str,
    ) -> Result<Value> {
        if !self.tool_calling {
            return structured_via_json(
                |s, u| self.complete(s, u, 0.0),
                system,
                user,
                schema,
                function_name,
            );
        }

        let body = json!({
            "model": self.model,
            "messages": Self::messages(system, user),
            "tools": [{
                "type": "function",
                "function": {
                    "name": function_name,
                    "description": schema.description.clone().unwrap_or_default(),
                    "parameters": schema.to_value(),
                },
            }],
            "tool_choice": {"type": "function", "function": {"name": function_name}},
        });

        let message = self.send(&body)?;
        let call = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.function.name == function_name)
            .ok_or_else(|| {
                CompletionError::shape(function_name, "the model did not call the function")
            })?;

        let arguments: Value = serde_json::from_str(&call.function.arguments)
            .map_err(|e| CompletionError::shape(function_name, format!("invalid JSON: {e}")))?;
        accept_arguments(schema, function_name, arguments)
    }
}
