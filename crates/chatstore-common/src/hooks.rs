//! Strategy interfaces injected into the adapter at construction
//!
//! Every trait has a blanket impl for the matching closure shape, so hooks
//! can be written inline or as dedicated types.

use std::fmt;

use crate::error::Result;
use crate::schema::FieldAttribute;
use crate::types::Value;

/// Pipeline direction a hook is invoked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Read,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Read => "read",
        })
    }
}

/// What a pipeline-wide hook knows about the value it is given
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Logical model name
    pub model: &'a str,
    /// Logical field name
    pub field: &'a str,
    pub attribute: &'a FieldAttribute,
    pub action: Action,
}

/// `custom_transform_input` / `custom_transform_output`
pub trait TransformHook: Send + Sync {
    fn transform(&self, context: &TransformContext<'_>, value: Value) -> Result<Value>;
}

impl<F> TransformHook for F
where
    F: Fn(&TransformContext<'_>, Value) -> Result<Value> + Send + Sync,
{
    fn transform(&self, context: &TransformContext<'_>, value: Value) -> Result<Value> {
        self(context, value)
    }
}

/// Per-field value transformer declared on a [`FieldAttribute`]
pub trait ValueTransform: Send + Sync {
    fn apply(&self, value: Value) -> Result<Value>;
}

impl<F> ValueTransform for F
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    fn apply(&self, value: Value) -> Result<Value> {
        self(value)
    }
}

/// Per-field input validator declared on a [`FieldAttribute`]
pub trait FieldValidator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<()>;
}

impl<F> FieldValidator for F
where
    F: Fn(&Value) -> Result<()> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<()> {
        self(value)
    }
}

/// Arguments handed to an [`IdGenerator`]
#[derive(Debug, Clone, Copy)]
pub struct IdRequest<'a> {
    pub model: &'a str,
    pub size: Option<usize>,
}

/// Client-side identifier generator
pub trait IdGenerator: Send + Sync {
    fn generate(&self, request: &IdRequest<'_>) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn(&IdRequest<'_>) -> String + Send + Sync,
{
    fn generate(&self, request: &IdRequest<'_>) -> String {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    #[test]
    fn test_closure_hooks() {
        let attribute = FieldAttribute::new(FieldType::String);
        let context = TransformContext {
            model: "chat",
            field: "title",
            attribute: &attribute,
            action: Action::Create,
        };

        let upper = |_: &TransformContext<'_>, value: Value| -> Result<Value> {
            Ok(match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            })
        };
        let hook: &dyn TransformHook = &upper;
        assert_eq!(
            hook.transform(&context, Value::from("hi")).unwrap(),
            Value::from("HI")
        );

        let generator = |request: &IdRequest<'_>| format!("{}-1", request.model);
        let generator: &dyn IdGenerator = &generator;
        assert_eq!(
            generator.generate(&IdRequest {
                model: "chat",
                size: None
            }),
            "chat-1"
        );
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Create.to_string(), "create");
        assert_eq!(Action::Read.to_string(), "read");
    }
}
