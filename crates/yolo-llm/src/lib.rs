//! `yolo-llm`: provider-neutral completion service.
//!
//! Callers see one trait, [`CompletionService`], with two operations: a
//! free-form completion and a schema-constrained completion that binds a
//! JSON schema as a function the model is forced to call.
//!
//! # Architecture
//!
//! ```text
//! ProviderConfig
//!     │
//!     ▼
//! connect()            ← picks a backend from the configured provider kind
//!     │
//!     ├── ChatCompletions   ← OpenAI, Mistral and compatible endpoints (tools + tool_choice)
//!     └── Messages          ← Anthropic messages API (tool_use blocks)
//!     │
//!     ▼
//! Box<dyn CompletionService>
//!     │
//!     ▼
//! Schema::validate()   ← structured output is shape-checked before it is returned
//! ```
//!
//! Backends that cannot bind tools fall back to strict JSON parsing with one
//! repair round-trip before giving up with [`CompletionError::ShapeMismatch`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use yolo_llm::{connect, ProviderConfig, ProviderKind};
//!
//! let config = ProviderConfig::new(ProviderKind::OpenAi).with_api_key(key);
//! let service = connect(&config)?;
//! let answer = service.complete("You are terse.", "Say hi.", 0.2)?;
//! ```

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod provider;
pub mod schema;
pub mod scripted;
pub mod service;

mod repair;

pub use error::CompletionError;
pub use provider::{connect, ProviderConfig, ProviderKind};
pub use schema::{Schema, SchemaType};
pub use service::{complete_as, CompletionService};

pub type Result<T> = std::result::Result<T, CompletionError>;
