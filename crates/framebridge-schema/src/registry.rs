use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use framebridge_message::Message;
use jsonschema::Validator;
use serde_json::{Map, Value};

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::validator::validate_payload;

const SCHEMA_SUFFIX: &str = ".schema.json";

/// Keywords whose value is an object of subschemas.
const SUBSCHEMA_MAPS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// Keywords whose value is a single subschema.
const SUBSCHEMA_SINGLE: [&str; 11] = [
    "propertyNames",
    "additionalProperties",
    "unevaluatedProperties",
    "items",
    "contains",
    "additionalItems",
    "unevaluatedItems",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose value is an array of subschemas.
const SUBSCHEMA_ARRAYS: [&str; 4] = ["prefixItems", "allOf", "anyOf", "oneOf"];

/// Keywords that only make sense on object schemas.
const OBJECT_KEYWORDS: [&str; 8] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
    "required",
    "dependentRequired",
    "dependentSchemas",
    "propertyNames",
];

/// Action-keyed registry of compiled JSON Schema validators.
pub struct SchemaRegistry {
    validators: HashMap<String, Validator>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            validators: HashMap::new(),
            config,
        }
    }

    /// Register the payload schema for `action` from a JSON string.
    pub fn register(&mut self, action: &str, schema_json: &str) -> Result<()> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(action, &schema)
    }

    /// Register the payload schema for `action` from a JSON value.
    pub fn register_value(&mut self, action: &str, schema: &Value) -> Result<()> {
        let mut schema = schema.clone();
        if self.config.strict_mode {
            close_object_schemas(&mut schema);
        }

        let compiled = jsonschema::validator_for(&schema)
            .map_err(|err| SchemaError::CompileFailed(format!("{action}: {err}")))?;

        self.validators.insert(action.to_string(), compiled);
        Ok(())
    }

    /// Load every `<action>.schema.json` file in `path`.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    ///
    /// Symlinked schema files are refused; other files are ignored.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        let mut loaded = 0usize;
        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(action) = action_from_file_name(&file_name) else {
                continue;
            };

            let entry_path = entry.path();
            let file_type = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?
                .file_type();
            if file_type.is_symlink() {
                return Err(SchemaError::LoadFailed(format!(
                    "refusing to load schema symlink: {file_name}"
                )));
            }
            if !file_type.is_file() {
                continue;
            }

            loaded += 1;
            if loaded > registry.config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({})",
                    registry.config.max_schemas_from_directory
                )));
            }

            let content = read_bounded(&entry_path, registry.config.max_schema_file_size)?;
            registry.register(action, &content)?;
            tracing::debug!(action, file = %file_name, "loaded payload schema");
        }

        Ok(registry)
    }

    /// Load from embedded `(action, schema)` pairs.
    pub fn from_embedded(schemas: &[(&str, &str)]) -> Result<Self> {
        let mut registry = Self::new();
        for (action, schema) in schemas {
            registry.register(action, schema)?;
        }
        Ok(registry)
    }

    /// Validate a payload against the schema registered for `action`.
    pub fn validate(&self, action: &str, payload: Option<&Value>) -> Result<()> {
        match self.validators.get(action) {
            Some(validator) => validate_payload(action, payload, validator),
            None if self.config.fail_on_missing_schema => {
                Err(SchemaError::NoSchema(action.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Validate the payload of an `action` or `request` message.
    ///
    /// Other message kinds carry no action payload and always pass.
    pub fn validate_message(&self, message: &Message) -> Result<()> {
        match message {
            Message::Action(m) => self.validate(&m.action, m.payload.as_ref()),
            Message::Request(m) => self.validate(&m.action, m.payload.as_ref()),
            _ => Ok(()),
        }
    }

    pub fn has_schema(&self, action: &str) -> bool {
        self.validators.contains_key(action)
    }

    /// Actions with a registered schema, sorted.
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self.validators.keys().cloned().collect();
        actions.sort_unstable();
        actions
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn action_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(SCHEMA_SUFFIX)
        .filter(|action| !action.is_empty())
}

fn read_bounded(path: &Path, max_bytes: usize) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;
    let limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);

    let mut content = String::new();
    file.take(limit)
        .read_to_string(&mut content)
        .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large (max {max_bytes} bytes): {}",
            path.display()
        )));
    }
    Ok(content)
}

/// Add `additionalProperties: false` to every object schema that leaves it unset.
fn close_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for keyword in SUBSCHEMA_MAPS {
                if let Some(Value::Object(children)) = map.get_mut(keyword) {
                    children.values_mut().for_each(close_object_schemas);
                }
            }
            for keyword in SUBSCHEMA_SINGLE {
                if let Some(child) = map.get_mut(keyword) {
                    close_object_schemas(child);
                }
            }
            for keyword in SUBSCHEMA_ARRAYS {
                if let Some(Value::Array(children)) = map.get_mut(keyword) {
                    children.iter_mut().for_each(close_object_schemas);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_object_schemas),
        _ => {}
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind == "object"),
        _ => OBJECT_KEYWORDS.iter().any(|keyword| map.contains_key(*keyword)),
    }
}
