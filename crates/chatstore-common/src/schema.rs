//! Schema registry: per-model, per-field metadata
//!
//! The registry is built once at process start and is read-only
//! afterwards. Besides driving the adapter pipeline, the serialised form of
//! [`FieldAttribute`] is what migration tooling consumes to emit DDL.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::hooks::{FieldValidator, ValueTransform};
use crate::types::Value;

/// Name of the identifier field every model carries
pub const ID_FIELD: &str = "id";

// ============================================================================
// Field Metadata
// ============================================================================

/// Declared type of a logical field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Json,
    StringList,
    NumberList,
}

impl FieldType {
    /// Structured types are stored as text when the backend lacks JSON
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Json | Self::StringList | Self::NumberList)
    }
}

/// Default applied on create when a field is absent
#[derive(Clone)]
pub enum DefaultValue {
    Static(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Static(value) => value.serialize(serializer),
            Self::Factory(_) => serializer.serialize_str("<generated>"),
        }
    }
}

/// Action taken on rows referencing a deleted target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    #[default]
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

/// Foreign-key-like relation to another model's field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    pub model: String,
    pub field: String,
    #[serde(default)]
    pub on_delete: OnDelete,
}

/// Metadata for one logical field of one model
#[derive(Clone, Serialize)]
pub struct FieldAttribute {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Physical column name; defaults to the logical name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_name: Option<String>,
    pub required: bool,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    /// When false, caller-supplied values are dropped on create/update
    pub accepts_input: bool,
    /// When false, the value is stripped before returning to the caller
    pub include_in_output: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<FieldReference>,
    pub sortable: bool,
    #[serde(skip)]
    pub input_transform: Option<Arc<dyn ValueTransform>>,
    #[serde(skip)]
    pub output_transform: Option<Arc<dyn ValueTransform>>,
    #[serde(skip)]
    pub input_validator: Option<Arc<dyn FieldValidator>>,
}

impl FieldAttribute {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            physical_name: None,
            required: true,
            unique: false,
            default_value: None,
            accepts_input: true,
            include_in_output: true,
            reference: None,
            sortable: false,
            input_transform: None,
            output_transform: None,
            input_validator: None,
        }
    }

    #[must_use]
    pub fn physical_name(mut self, name: impl Into<String>) -> Self {
        self.physical_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(DefaultValue::Static(value.into()));
        self
    }

    #[must_use]
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_value = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    #[must_use]
    pub fn accepts_input(mut self, accepts: bool) -> Self {
        self.accepts_input = accepts;
        self
    }

    #[must_use]
    pub fn include_in_output(mut self, include: bool) -> Self {
        self.include_in_output = include;
        self
    }

    #[must_use]
    pub fn references(mut self, model: impl Into<String>, field: impl Into<String>) -> Self {
        self.reference = Some(FieldReference {
            model: model.into(),
            field: field.into(),
            on_delete: OnDelete::default(),
        });
        self
    }

    #[must_use]
    pub fn on_delete(mut self, action: OnDelete) -> Self {
        if let Some(reference) = self.reference.as_mut() {
            reference.on_delete = action;
        }
        self
    }

    #[must_use]
    pub fn input_transform<T: ValueTransform + 'static>(mut self, transform: T) -> Self {
        self.input_transform = Some(Arc::new(transform));
        self
    }

    #[must_use]
    pub fn output_transform<T: ValueTransform + 'static>(mut self, transform: T) -> Self {
        self.output_transform = Some(Arc::new(transform));
        self
    }

    #[must_use]
    pub fn input_validator<V: FieldValidator + 'static>(mut self, validator: V) -> Self {
        self.input_validator = Some(Arc::new(validator));
        self
    }

    /// Physical column name for the given logical name
    pub fn column<'a>(&'a self, logical: &'a str) -> &'a str {
        self.physical_name.as_deref().unwrap_or(logical)
    }

    /// True when the field points at another model's identifier
    pub fn references_id(&self) -> bool {
        self.reference
            .as_ref()
            .is_some_and(|reference| reference.field == ID_FIELD)
    }
}

impl fmt::Debug for FieldAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAttribute")
            .field("field_type", &self.field_type)
            .field("physical_name", &self.physical_name)
            .field("required", &self.required)
            .field("unique", &self.unique)
            .field("default_value", &self.default_value)
            .field("accepts_input", &self.accepts_input)
            .field("include_in_output", &self.include_in_output)
            .field("reference", &self.reference)
            .field("sortable", &self.sortable)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Models and Registry
// ============================================================================

/// Fields of one model, keyed by logical name
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelSchema {
    /// Physical table name override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub fields: BTreeMap<String, FieldAttribute>,
}

impl ModelSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, attribute: FieldAttribute) -> Self {
        self.fields.insert(name.into(), attribute);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldAttribute> {
        self.fields.get(field)
    }

    /// Physical table name for the given logical model name
    pub fn table<'a>(&'a self, logical: &'a str) -> &'a str {
        self.model_name.as_deref().unwrap_or(logical)
    }
}

/// All models known to the adapter
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SchemaRegistry {
    models: BTreeMap<String, ModelSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model(mut self, name: impl Into<String>, schema: ModelSchema) -> Self {
        self.models.insert(name.into(), schema);
        self
    }

    /// Look a model up by logical name, falling back to its physical name.
    /// Returns the logical name alongside the schema.
    pub fn resolve(&self, name: &str) -> Option<(&str, &ModelSchema)> {
        if let Some((logical, schema)) = self.models.get_key_value(name) {
            return Some((logical.as_str(), schema));
        }
        self.models
            .iter()
            .find(|(_, schema)| schema.model_name.as_deref() == Some(name))
            .map(|(logical, schema)| (logical.as_str(), schema))
    }

    pub fn get(&self, name: &str) -> Option<&ModelSchema> {
        self.resolve(name).map(|(_, schema)| schema)
    }

    pub fn models(&self) -> impl Iterator<Item = (&str, &ModelSchema)> {
        self.models.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .model(
                "user",
                ModelSchema::new()
                    .model_name("users")
                    .field(
                        "email",
                        FieldAttribute::new(FieldType::String)
                            .physical_name("email_address")
                            .unique(),
                    )
                    .field(
                        "password",
                        FieldAttribute::new(FieldType::String).include_in_output(false),
                    ),
            )
            .model(
                "chat",
                ModelSchema::new().field(
                    "userId",
                    FieldAttribute::new(FieldType::String)
                        .physical_name("user_id")
                        .references("user", "id")
                        .on_delete(OnDelete::SetNull),
                ),
            )
    }

    #[test]
    fn test_resolve_by_logical_and_physical_name() {
        let registry = registry();
        assert_eq!(registry.resolve("user").map(|(n, _)| n), Some("user"));
        assert_eq!(registry.resolve("users").map(|(n, _)| n), Some("user"));
        assert!(registry.resolve("missing").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_field_columns() {
        let registry = registry();
        let user = registry.get("user").unwrap();
        assert_eq!(user.get("email").unwrap().column("email"), "email_address");
        assert_eq!(user.get("password").unwrap().column("password"), "password");
        assert_eq!(user.table("user"), "users");
    }

    #[test]
    fn test_reference_metadata() {
        let registry = registry();
        let attribute = registry.get("chat").unwrap().get("userId").unwrap();
        assert!(attribute.references_id());
        assert_eq!(
            attribute.reference.as_ref().unwrap().on_delete,
            OnDelete::SetNull
        );
    }

    #[test]
    fn test_default_value_factory() {
        let attribute = FieldAttribute::new(FieldType::Boolean)
            .default_with(|| Value::Bool(false));
        assert_eq!(
            attribute.default_value.as_ref().unwrap().produce(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_schema_serializes_for_migrations() {
        let json = serde_json::to_value(registry()).unwrap();
        assert_eq!(json["user"]["model_name"], "users");
        assert_eq!(
            json["user"]["fields"]["email"]["physical_name"],
            "email_address"
        );
        assert_eq!(json["user"]["fields"]["email"]["type"], "string");
        assert_eq!(json["chat"]["fields"]["userId"]["reference"]["model"], "user");
        assert_eq!(
            json["user"]["fields"]["password"]["include_in_output"],
            false
        );
    }
}
