//! A completion service that replays queued replies. Used by tests and by
//! offline runs that must not reach a provider.

use crate::error::CompletionError;
use crate::schema::Schema;
use crate::service::{accept_arguments, CompletionService};
use crate::Result;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Structured(Value),
    Failure(String),
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    /// Set for structured calls.
    pub function: Option<String>,
}

#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply. Structured calls parse it as JSON, so malformed
    /// text surfaces as a shape mismatch.
    pub fn text(self, reply: impl Into<String>) -> Self {
        self.push(Reply::Text(reply.into()))
    }

    pub fn structured(self, reply: Value) -> Self {
        self.push(Reply::Structured(reply))
    }

    /// Queue a transport failure.
    pub fn failure(self, message: impl Into<String>) -> Self {
        self.push(Reply::Failure(message.into()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(self, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
        self
    }

    fn next(&self, system: &str, user: &str, function: Option<&str>) -> Result<Reply> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
                function: function.map(str::to_string),
            });
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or(CompletionError::NoResponse)
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, system: &str, user: &str, _temperature: f32) -> Result<String> {
        match self.next(system, user, None)? {
            Reply::Text(text) => Ok(text),
            Reply::Structured(value) => Ok(value.to_string()),
            Reply::Failure(message) => Err(CompletionError::Provider(message)),
        }
    }

    fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema: &Schema,
        function_name: &str,
    ) -> Result<Value> {
        let value = match self.next(system, user, Some(function_name))? {
            Reply::Structured(value) => value,
            Reply::Text(text) => serde_json::from_str(&text).map_err(|e| {
                CompletionError::shape(function_name, format!("invalid JSON: {e}"))
            })?,
            Reply::Failure(message) => return Err(CompletionError::Provider(message)),
        };
        accept_arguments(schema, function_name, value)
    }
}
