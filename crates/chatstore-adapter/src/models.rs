//! Chat domain models
//!
//! Logical field names are camelCase; physical columns are snake_case.

use chrono::Utc;

use chatstore_common::schema::{FieldAttribute, FieldType, ModelSchema, OnDelete, SchemaRegistry};
use chatstore_common::types::Value;

fn created_at() -> FieldAttribute {
    FieldAttribute::new(FieldType::Date)
        .physical_name("created_at")
        .default_with(|| Value::Date(Utc::now()))
        .sortable()
}

fn owner(model: &str) -> FieldAttribute {
    FieldAttribute::new(FieldType::String)
        .references(model, "id")
        .on_delete(OnDelete::Cascade)
}

pub fn user() -> ModelSchema {
    ModelSchema::new()
        .field("email", FieldAttribute::new(FieldType::String).unique())
        .field(
            "password",
            FieldAttribute::new(FieldType::String)
                .optional()
                .include_in_output(false),
        )
}

pub fn chat() -> ModelSchema {
    ModelSchema::new()
        .field("createdAt", created_at())
        .field("title", FieldAttribute::new(FieldType::String))
        .field("userId", owner("user").physical_name("user_id"))
        .field(
            "visibility",
            FieldAttribute::new(FieldType::String)
                .default_value("private")
                .input_validator(|value: &Value| match value.as_str() {
                    Some("public" | "private") => Ok(()),
                    _ => Err(chatstore_common::Error::Validation(format!(
                        "visibility must be 'public' or 'private', got {}",
                        value
                    ))),
                }),
        )
}

pub fn message() -> ModelSchema {
    ModelSchema::new()
        .field("chatId", owner("chat").physical_name("chat_id"))
        .field("role", FieldAttribute::new(FieldType::String))
        .field("parts", FieldAttribute::new(FieldType::Json))
        .field(
            "attachments",
            FieldAttribute::new(FieldType::Json).default_with(|| Value::Array(Vec::new())),
        )
        .field("createdAt", created_at())
}

pub fn vote() -> ModelSchema {
    ModelSchema::new()
        .field("chatId", owner("chat").physical_name("chat_id"))
        .field("messageId", owner("message").physical_name("message_id"))
        .field(
            "isUpvoted",
            FieldAttribute::new(FieldType::Boolean).physical_name("is_upvoted"),
        )
}

pub fn document() -> ModelSchema {
    ModelSchema::new()
        .field("createdAt", created_at())
        .field("title", FieldAttribute::new(FieldType::String))
        .field("content", FieldAttribute::new(FieldType::String).optional())
        .field(
            "kind",
            FieldAttribute::new(FieldType::String).default_value("text"),
        )
        .field("userId", owner("user").physical_name("user_id"))
}

pub fn suggestion() -> ModelSchema {
    ModelSchema::new()
        .field("documentId", owner("document").physical_name("document_id"))
        .field(
            "documentCreatedAt",
            FieldAttribute::new(FieldType::Date).physical_name("document_created_at"),
        )
        .field(
            "originalText",
            FieldAttribute::new(FieldType::String).physical_name("original_text"),
        )
        .field(
            "suggestedText",
            FieldAttribute::new(FieldType::String).physical_name("suggested_text"),
        )
        .field("description", FieldAttribute::new(FieldType::String).optional())
        .field(
            "isResolved",
            FieldAttribute::new(FieldType::Boolean)
                .physical_name("is_resolved")
                .default_value(false),
        )
        .field("userId", owner("user").physical_name("user_id"))
        .field("createdAt", created_at())
}

/// Registry of every chat model
pub fn chat_schema() -> SchemaRegistry {
    SchemaRegistry::new()
        .model("user", user())
        .model("chat", chat())
        .model("message", message())
        .model("vote", vote())
        .model("document", document())
        .model("suggestion", suggestion())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_schema_models() {
        let schema = chat_schema();
        let names: Vec<&str> = schema.models().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["chat", "document", "message", "suggestion", "user", "vote"]
        );
    }

    #[test]
    fn test_references_resolve() {
        let schema = chat_schema();
        for (model, fields) in schema.models() {
            for (field, attribute) in &fields.fields {
                if let Some(reference) = &attribute.reference {
                    assert!(
                        schema.get(&reference.model).is_some(),
                        "{}.{} points at a missing model",
                        model,
                        field
                    );
                }
            }
        }
    }

    #[test]
    fn test_columns_are_snake_case() {
        let schema = chat_schema();
        for (_, fields) in schema.models() {
            for (field, attribute) in &fields.fields {
                let column = attribute.column(field);
                assert!(
                    column.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                    "{} maps to {}",
                    field,
                    column
                );
            }
        }
    }

    #[test]
    fn test_visibility_validator() {
        let chat = chat();
        let validator = chat
            .get("visibility")
            .and_then(|attribute| attribute.input_validator.as_ref())
            .unwrap();
        assert!(validator.validate(&Value::from("public")).is_ok());
        assert!(validator.validate(&Value::from("secret")).is_err());
    }
}
