use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl SchemaType {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Null => "null",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
            SchemaType::String => value.is_string(),
            SchemaType::Number => value.is_number(),
            SchemaType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Null => value.is_null(),
        }
    }
}

/// A JSON-Schema-shaped tree, serialized verbatim as a tool's parameters.
///
/// Only the subset the engine binds is modelled: `type`, `properties`,
/// `items`, `required`, `enum`, the `oneOf`/`anyOf`/`allOf`/`not`
/// combinators, `$ref` and `definitions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Value>,
    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Schema>,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

impl Schema {
    pub fn of(kind: SchemaType) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    /// A `$ref` into this schema's root `definitions`.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("#/definitions/{name}")),
            ..Default::default()
        }
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn property(mut self, name: &str, schema: Schema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn require(mut self, names: &[&str]) -> Self {
        self.required.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn one_of_strings(mut self, values: &[&str]) -> Self {
        self.allowed
            .extend(values.iter().map(|v| Value::String(v.to_string())));
        self
    }

    pub fn define(mut self, name: &str, schema: Schema) -> Self {
        self.definitions.insert(name.to_string(), schema);
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Shape validation
// ---------------------------------------------------------------------------

impl Schema {
    /// Check `value` against this schema. The error names the first offending
    /// path, e.g. `$.epics[0].status: "done" is not one of ["planned", ...]`.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        self.check(value, "$", self, 0)
    }

    fn check(&self, value: &Value, path: &str, root: &Schema, depth: usize) -> Result<(), String> {
        if depth > MAX_DEPTH {
            return Err(format!("{path}: schema nesting exceeds {MAX_DEPTH} levels"));
        }

        if let Some(reference) = &self.reference {
            let target = resolve(root, reference)
                .ok_or_else(|| format!("{path}: unresolved $ref '{reference}'"))?;
            target.check(value, path, root, depth + 1)?;
        }

        if let Some(kind) = self.kind {
            if !kind.matches(value) {
                return Err(format!(
                    "{path}: expected {}, found {}",
                    kind.as_str(),
                    describe_value(value)
                ));
            }
        }

        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            let allowed: Vec<String> = self.allowed.iter().map(|v| v.to_string()).collect();
            return Err(format!(
                "{path}: {value} is not one of [{}]",
                allowed.join(", ")
            ));
        }

        if let Value::Object(map) = value {
            for name in &self.required {
                if !map.contains_key(name) {
                    return Err(format!("{path}: missing required property '{name}'"));
                }
            }
            for (name, schema) in &self.properties {
                if let Some(child) = map.get(name) {
                    schema.check(child, &format!("{path}.{name}"), root, depth + 1)?;
                }
            }
        }

        if let (Value::Array(elements), Some(items)) = (value, &self.items) {
            for (i, element) in elements.iter().enumerate() {
                items.check(element, &format!("{path}[{i}]"), root, depth + 1)?;
            }
        }

        for schema in &self.all_of {
            schema.check(value, path, root, depth + 1)?;
        }

        if !self.any_of.is_empty()
            && !self
                .any_of
                .iter()
                .any(|s| s.check(value, path, root, depth + 1).is_ok())
        {
            return Err(format!("{path}: matches none of the anyOf alternatives"));
        }

        if !self.one_of.is_empty() {
            let matched = self
                .one_of
                .iter()
                .filter(|s| s.check(value, path, root, depth + 1).is_ok())
                .count();
            if matched != 1 {
                return Err(format!(
                    "{path}: matches {matched} oneOf alternatives, expected exactly 1"
                ));
            }
        }

        if let Some(not) = &self.not {
            if not.check(value, path, root, depth + 1).is_ok() {
                return Err(format!("{path}: matches a schema it must not match"));
            }
        }

        Ok(())
    }
}

fn resolve<'a>(root: &'a Schema, reference: &str) -> Option<&'a Schema> {
    if reference == "#" {
        return Some(root);
    }
    let name = reference.strip_prefix("#/definitions/")?;
    root.definitions.get(name)
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
