use crate::error::CompletionError;
use crate::schema::Schema;
use crate::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The only contract engine code sees. Backends are chosen by [`crate::connect`].
pub trait CompletionService: Send + Sync {
    /// Free-form completion.
    fn complete(&self, system: &str, user: &str, temperature: f32) -> Result<String>;

    /// Schema-constrained completion. Returns the arguments the model passed
    /// to `function_name`, already validated against `schema`.
    fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema: &Schema,
        function_name: &str,
    ) -> Result<Value>;
}

/// Run a structured completion and deserialize the arguments into `T`.
pub fn complete_as<T: DeserializeOwned>(
    service: &dyn CompletionService,
    system: &str,
    user: &str,
    schema: &Schema,
    function_name: &str,
) -> Result<T> {
    let value = service.complete_structured(system, user, schema, function_name)?;
    serde_json::from_value(value).map_err(|e| CompletionError::shape(function_name, e.to_string()))
}

/// Accept `arguments` only when they parse and satisfy `schema`.
pub(crate) fn accept_arguments(schema: &Schema, function_name: &str, arguments: Value) -> Result<Value> {
    schema
        .validate(&arguments)
        .map_err(|reason| CompletionError::shape(function_name, reason))?;
    Ok(arguments)
}
