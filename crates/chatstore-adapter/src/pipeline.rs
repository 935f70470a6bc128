//! Transform pipeline: the public [`Adapter`]
//!
//! Every call runs its own pipeline over immutable shared configuration:
//! input side, one backend call, output side. Nothing survives between
//! calls and no locks are taken here.
//!
//! Input, per field: validator, field transform, numeric reference
//! coercion, capability coercion, `custom_transform_input`. Defaults are
//! filled on create only and required fields are enforced last.
//!
//! Output, the mirror: `custom_transform_output`, reverse coercion, field
//! transform, output key mapping, pruning of hidden fields, selection.

use std::sync::Arc;

use tracing::debug;

use chatstore_common::config::{AdapterConfig, DatabaseOptions};
use chatstore_common::error::{Error, Result};
use chatstore_common::hooks::{Action, TransformContext};
use chatstore_common::schema::{FieldAttribute, FieldType, SchemaRegistry, ID_FIELD};
use chatstore_common::types::{Record, SortBy, Value, Where};

use crate::backend::{BackendDriver, FindManyQuery};
use crate::coerce::{self, Capabilities};
use crate::fields::ModelView;
use crate::id::IdPolicy;
use crate::where_clause;

/// Per-call options of [`Adapter::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Logical fields to return; `id` is dropped unless listed
    pub select: Option<Vec<String>>,
    /// Keep a caller-supplied id regardless of the generation policy
    pub force_allow_id: bool,
}

impl CreateOptions {
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn force_allow_id(mut self) -> Self {
        self.force_allow_id = true;
        self
    }
}

/// Per-call options of [`Adapter::find_many`]
#[derive(Debug, Clone, Default)]
pub struct FindManyOptions {
    pub where_clause: Vec<Where>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<SortBy>,
    pub select: Option<Vec<String>>,
}

/// Shared state of an adapter; immutable after construction
pub(crate) struct AdapterInner {
    pub config: AdapterConfig,
    pub database: DatabaseOptions,
    pub schema: SchemaRegistry,
    pub backend: Arc<dyn BackendDriver>,
    pub id_policy: IdPolicy,
    pub id_attribute: FieldAttribute,
    pub capabilities: Capabilities,
    /// Ids come from the backend sequence, so id and reference values
    /// are sent as integers
    pub numeric_keys: bool,
}

/// Uniform record store over a pluggable backend driver.
///
/// Cheap to clone; clones share the same configuration and driver.
#[derive(Clone)]
pub struct Adapter {
    inner: Arc<AdapterInner>,
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("adapter_id", &self.inner.config.adapter_id)
            .field("models", &self.inner.schema.len())
            .finish_non_exhaustive()
    }
}

impl Adapter {
    pub(crate) fn from_parts(
        config: AdapterConfig,
        database: DatabaseOptions,
        schema: SchemaRegistry,
        backend: Arc<dyn BackendDriver>,
    ) -> Self {
        let id_policy = IdPolicy::new(&config, &database);
        let id_attribute = FieldAttribute::new(if database.use_number_id {
            FieldType::Number
        } else {
            FieldType::String
        });
        let capabilities = Capabilities::from(&config);
        let numeric_keys = id_policy.backend_assigns_ids();

        Self {
            inner: Arc::new(AdapterInner {
                config,
                database,
                schema,
                backend,
                id_policy,
                id_attribute,
                capabilities,
                numeric_keys,
            }),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.inner.config
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.inner.schema
    }

    pub fn database_options(&self) -> &DatabaseOptions {
        &self.inner.database
    }

    /// Physical table name the backend receives for a model
    pub fn model_name(&self, model: &str) -> Result<String> {
        let (logical, schema) = self
            .inner
            .schema
            .resolve(model)
            .ok_or_else(|| Error::ModelNotFound(model.to_string()))?;
        let table = schema.table(logical);
        Ok(if self.inner.config.use_plural {
            format!("{}s", table)
        } else {
            table.to_string()
        })
    }

    fn view(&self, model: &str) -> Result<ModelView<'_>> {
        let (name, schema) = self
            .inner
            .schema
            .resolve(model)
            .ok_or_else(|| Error::ModelNotFound(model.to_string()))?;
        Ok(ModelView {
            name,
            schema,
            config: &self.inner.config,
            id_attribute: &self.inner.id_attribute,
        })
    }

    fn trace(&self, action: &str, model: &str, stage: &str, payload: &dyn std::fmt::Debug) {
        if self.inner.config.debug_logs {
            debug!(
                adapter = %self.inner.config.adapter_id,
                action,
                model,
                stage,
                payload = ?payload,
                "adapter pipeline"
            );
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create one record and return it in logical form
    pub async fn create(&self, model: &str, data: Record, options: CreateOptions) -> Result<Record> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let payload = self.transform_input(&view, data, Action::Create, options.force_allow_id)?;
        self.trace("create", &table, "input", &payload);

        let select = options
            .select
            .as_deref()
            .map(|fields| where_clause::translate_select(&view, fields));
        let raw = self
            .inner
            .backend
            .create(&table, payload, select.as_deref())
            .await?;
        self.trace("create", &table, "backend", &raw);

        let mut record = self.transform_output(&view, raw, options.select.as_deref())?;
        let id_selected = options
            .select
            .as_ref()
            .map_or(true, |fields| fields.iter().any(|f| f == ID_FIELD));
        if id_selected {
            record.entry(ID_FIELD.to_string()).or_insert(Value::Null);
        }
        Ok(record)
    }

    /// Update the first matching record; `None` when nothing matched
    pub async fn update(
        &self,
        model: &str,
        where_clause: &[Where],
        update: Record,
    ) -> Result<Option<Record>> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let payload = self.transform_input(&view, update, Action::Update, false)?;
        let cleaned = where_clause::translate(&view, self.inner.numeric_keys, where_clause);
        self.trace("update", &table, "input", &payload);
        self.trace("update", &table, "where", &cleaned);

        match self.inner.backend.update(&table, &cleaned, payload).await? {
            Some(raw) => Ok(Some(self.transform_output(&view, raw, None)?)),
            None => Ok(None),
        }
    }

    /// Update every matching record; returns the affected count
    pub async fn update_many(&self, model: &str, where_clause: &[Where], update: Record) -> Result<u64> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let payload = self.transform_input(&view, update, Action::Update, false)?;
        let cleaned = where_clause::translate(&view, self.inner.numeric_keys, where_clause);
        self.trace("update_many", &table, "input", &payload);
        self.trace("update_many", &table, "where", &cleaned);

        self.inner.backend.update_many(&table, &cleaned, payload).await
    }

    pub async fn count(&self, model: &str, where_clause: &[Where]) -> Result<u64> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let cleaned = where_clause::translate(&view, self.inner.numeric_keys, where_clause);
        self.trace("count", &table, "where", &cleaned);

        self.inner.backend.count(&table, &cleaned).await
    }

    pub async fn delete(&self, model: &str, where_clause: &[Where]) -> Result<()> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let cleaned = where_clause::translate(&view, self.inner.numeric_keys, where_clause);
        self.trace("delete", &table, "where", &cleaned);

        self.inner.backend.delete(&table, &cleaned).await
    }

    pub async fn delete_many(&self, model: &str, where_clause: &[Where]) -> Result<u64> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let cleaned = where_clause::translate(&view, self.inner.numeric_keys, where_clause);
        self.trace("delete_many", &table, "where", &cleaned);

        self.inner.backend.delete_many(&table, &cleaned).await
    }

    pub async fn find_one(
        &self,
        model: &str,
        where_clause: &[Where],
        select: Option<&[String]>,
    ) -> Result<Option<Record>> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let cleaned = where_clause::translate(&view, self.inner.numeric_keys, where_clause);
        self.trace("find_one", &table, "where", &cleaned);

        let physical_select = select.map(|fields| where_clause::translate_select(&view, fields));
        let raw = self
            .inner
            .backend
            .find_one(&table, &cleaned, physical_select.as_deref())
            .await?;

        raw.map(|raw| self.transform_output(&view, raw, select))
            .transpose()
    }

    pub async fn find_many(&self, model: &str, options: FindManyOptions) -> Result<Vec<Record>> {
        let view = self.view(model)?;
        let table = self.model_name(model)?;

        let query = FindManyQuery {
            where_clause: where_clause::translate(
                &view,
                self.inner.numeric_keys,
                &options.where_clause,
            ),
            limit: Some(
                options
                    .limit
                    .unwrap_or(self.inner.database.default_find_many_limit),
            ),
            offset: options.offset,
            sort_by: options
                .sort_by
                .as_ref()
                .map(|sort_by| where_clause::translate_sort(&view, sort_by)),
            select: options
                .select
                .as_deref()
                .map(|fields| where_clause::translate_select(&view, fields)),
        };
        self.trace("find_many", &table, "query", &query);

        let rows = self.inner.backend.find_many(&table, &query).await?;
        rows.into_iter()
            .map(|raw| self.transform_output(&view, raw, options.select.as_deref()))
            .collect()
    }

    // ========================================================================
    // Input Side
    // ========================================================================

    fn transform_input(
        &self,
        view: &ModelView<'_>,
        mut data: Record,
        action: Action,
        force_allow_id: bool,
    ) -> Result<Record> {
        let mut payload = Record::new();

        if action == Action::Create {
            let decision = self.inner.id_policy.resolve(view.name, &data, force_allow_id);
            if let Some(id) = decision.into_value() {
                payload.insert(view.physical_field(ID_FIELD), id);
            }
        }
        // Never part of an update, never reprocessed on create
        data.remove(ID_FIELD);

        let mut missing = Vec::new();
        for (field, attribute) in view.fields().filter(|(name, _)| *name != ID_FIELD) {
            let supplied = data.remove(field);
            if supplied.is_some() && !attribute.accepts_input {
                self.trace(&action.to_string(), view.name, "drop-readonly", &field);
            }
            let supplied = supplied.filter(|_| attribute.accepts_input);

            let value = match (supplied, action) {
                (Some(value), Action::Update) => value,
                (Some(value), _) if !value.is_null() => value,
                (_, Action::Create) => match &attribute.default_value {
                    Some(default) => default.produce(),
                    None => {
                        if attribute.required {
                            missing.push(field);
                        }
                        continue;
                    }
                },
                _ => continue,
            };

            let value = self.input_value(view, field, attribute, value, action)?;
            payload.insert(view.physical_field(field), value);
        }

        if let Some(field) = missing.first() {
            return Err(Error::missing_field(view.name, *field));
        }
        if !data.is_empty() {
            let unknown: Vec<&String> = data.keys().collect();
            self.trace(&action.to_string(), view.name, "drop-unknown", &unknown);
        }

        Ok(payload)
    }

    fn input_value(
        &self,
        view: &ModelView<'_>,
        field: &str,
        attribute: &FieldAttribute,
        value: Value,
        action: Action,
    ) -> Result<Value> {
        if let Some(validator) = &attribute.input_validator {
            validator.validate(&value)?;
        }
        let mut value = match &attribute.input_transform {
            Some(transform) => transform.apply(value)?,
            None => value,
        };
        if self.inner.numeric_keys && attribute.references_id() {
            value = coerce::to_numeric_id(value);
        }
        let value = coerce::to_storage(value, attribute, self.inner.capabilities)?;

        match &self.inner.config.custom_transform_input {
            Some(hook) => hook.transform(
                &TransformContext {
                    model: view.name,
                    field,
                    attribute,
                    action,
                },
                value,
            ),
            None => Ok(value),
        }
    }

    // ========================================================================
    // Output Side
    // ========================================================================

    fn transform_output(
        &self,
        view: &ModelView<'_>,
        raw: Record,
        select: Option<&[String]>,
    ) -> Result<Record> {
        let mut record = Record::new();

        for (field, attribute) in view.fields() {
            if !attribute.include_in_output {
                continue;
            }
            if let Some(fields) = select {
                if !fields.iter().any(|f| f == field) {
                    continue;
                }
            }

            let source = view.output_source_key(field, attribute);
            let Some(value) = raw.get(source).cloned() else {
                continue;
            };

            let value = match &self.inner.config.custom_transform_output {
                Some(hook) => hook.transform(
                    &TransformContext {
                        model: view.name,
                        field,
                        attribute,
                        action: Action::Read,
                    },
                    value,
                )?,
                None => value,
            };

            let value = if field == ID_FIELD || attribute.references_id() {
                coerce::to_string_id(value)
            } else {
                coerce::from_storage(value, attribute, self.inner.capabilities)
            };

            let value = match &attribute.output_transform {
                Some(transform) => transform.apply(value)?,
                None => value,
            };

            record.insert(field.to_string(), value);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use chatstore_common::record;
    use chatstore_common::schema::ModelSchema;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new().model(
            "user",
            ModelSchema::new()
                .field("name", FieldAttribute::new(FieldType::String))
                .field(
                    "email",
                    FieldAttribute::new(FieldType::String).physical_name("email_address"),
                )
                .field(
                    "role",
                    FieldAttribute::new(FieldType::String)
                        .default_value("member")
                        .accepts_input(false),
                )
                .field(
                    "password",
                    FieldAttribute::new(FieldType::String)
                        .optional()
                        .include_in_output(false),
                )
                .field(
                    "verified",
                    FieldAttribute::new(FieldType::Boolean).default_value(false),
                ),
        )
    }

    fn adapter(config: AdapterConfig) -> (Adapter, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let adapter = Adapter::from_parts(
            config,
            DatabaseOptions::default(),
            schema(),
            backend.clone(),
        );
        (adapter, backend)
    }

    #[tokio::test]
    async fn test_create_fills_defaults_and_drops_readonly_input() {
        let (adapter, backend) = adapter(AdapterConfig::default());
        let created = adapter
            .create(
                "user",
                record! { "name" => "Ada", "email" => "ada@example.com", "role" => "admin", "password" => "secret" },
                CreateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(created.get("role"), Some(&Value::from("member")));
        assert_eq!(created.get("verified"), Some(&Value::Bool(false)));
        assert_eq!(created.get("email"), Some(&Value::from("ada@example.com")));
        assert!(created.get("password").is_none());
        assert_eq!(created.get("id").and_then(Value::as_str).map(str::len), Some(32));

        let stored = &backend.rows("user")[0];
        assert_eq!(stored.get("email_address"), Some(&Value::from("ada@example.com")));
        assert_eq!(stored.get("password"), Some(&Value::from("secret")));
    }

    #[tokio::test]
    async fn test_missing_required_field() {
        let (adapter, backend) = adapter(AdapterConfig::default());
        let err = adapter
            .create("user", record! { "name" => "Ada" }, CreateOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingField { ref field, .. } if field == "email"));
        assert!(backend.rows("user").is_empty());
    }

    #[tokio::test]
    async fn test_update_skips_defaults_and_id() {
        let (adapter, backend) = adapter(AdapterConfig::default());
        let created = adapter
            .create(
                "user",
                record! { "name" => "Ada", "email" => "a@x.io" },
                CreateOptions::default(),
            )
            .await
            .unwrap();
        let id = created.get("id").cloned().unwrap();

        let updated = adapter
            .update(
                "user",
                &[Where::eq("id", id.clone())],
                record! { "id" => "hijack", "name" => "Grace" },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.get("id"), Some(&id));
        assert_eq!(updated.get("name"), Some(&Value::from("Grace")));
        assert_eq!(backend.rows("user")[0].get("id"), Some(&id));
    }

    #[tokio::test]
    async fn test_not_found_is_not_an_error() {
        let (adapter, _) = adapter(AdapterConfig::default());
        let missing = [Where::eq("id", "nope")];

        assert!(adapter
            .update("user", &missing, record! { "name" => "x" })
            .await
            .unwrap()
            .is_none());
        assert!(adapter.find_one("user", &missing, None).await.unwrap().is_none());
        assert!(adapter
            .find_many("user", FindManyOptions::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(adapter.count("user", &missing).await.unwrap(), 0);
        assert_eq!(adapter.delete_many("user", &missing).await.unwrap(), 0);
        adapter.delete("user", &missing).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let (adapter, _) = adapter(AdapterConfig::default());
        let err = adapter.count("nope", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_plural_model_names() {
        let (adapter, backend) = adapter(AdapterConfig {
            use_plural: true,
            ..AdapterConfig::default()
        });
        assert_eq!(adapter.model_name("user").unwrap(), "users");

        adapter
            .create(
                "user",
                record! { "name" => "Ada", "email" => "a@x.io" },
                CreateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(backend.table_names(), vec!["users".to_string()]);
    }

    #[tokio::test]
    async fn test_hook_errors_pass_through() {
        let config = AdapterConfig::default().with_custom_transform_input(
            |_: &TransformContext<'_>, _: Value| -> Result<Value> {
                Err(Error::Hook("rejected".to_string()))
            },
        );
        let (adapter, _) = adapter(config);

        let err = adapter
            .create(
                "user",
                record! { "name" => "Ada", "email" => "a@x.io" },
                CreateOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Hook(ref message) if message == "rejected"));
    }

    #[tokio::test]
    async fn test_field_validator_and_transforms() {
        let schema = SchemaRegistry::new().model(
            "user",
            ModelSchema::new().field(
                "email",
                FieldAttribute::new(FieldType::String)
                    .input_validator(|value: &Value| match value.as_str() {
                        Some(text) if text.contains('@') => Ok(()),
                        _ => Err(Error::Validation("invalid email".to_string())),
                    })
                    .input_transform(|value: Value| -> Result<Value> {
                        Ok(Value::from(value.to_string().trim().to_string()))
                    })
                    .output_transform(|value: Value| -> Result<Value> {
                        Ok(Value::from(format!("<{}>", value)))
                    }),
            ),
        );
        let backend = Arc::new(InMemoryBackend::new());
        let adapter = Adapter::from_parts(
            AdapterConfig::default(),
            DatabaseOptions::default(),
            schema,
            backend.clone(),
        );

        let err = adapter
            .create("user", record! { "email" => "nope" }, CreateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let created = adapter
            .create("user", record! { "email" => " a@x.io " }, CreateOptions::default())
            .await
            .unwrap();
        assert_eq!(backend.rows("user")[0].get("email"), Some(&Value::from("a@x.io")));
        assert_eq!(created.get("email"), Some(&Value::from("<a@x.io>")));
    }

    #[tokio::test]
    async fn test_backend_assigned_ids_round_trip() {
        use chatstore_common::config::GenerateId;

        let configs = [
            (
                AdapterConfig {
                    disable_id_generation: true,
                    ..AdapterConfig::default()
                },
                DatabaseOptions::default(),
            ),
            (
                AdapterConfig::default(),
                DatabaseOptions {
                    generate_id: GenerateId::Disabled,
                    ..DatabaseOptions::default()
                },
            ),
        ];

        for (config, database) in configs {
            let backend = Arc::new(InMemoryBackend::new());
            let adapter = Adapter::from_parts(config, database, schema(), backend.clone());

            let created = adapter
                .create(
                    "user",
                    record! { "name" => "Ada", "email" => "a@x.io" },
                    CreateOptions::default(),
                )
                .await
                .unwrap();
            assert_eq!(created.get("id"), Some(&Value::from("1")));
            assert_eq!(backend.rows("user")[0].get("id"), Some(&Value::Int(1)));

            let by_id = [Where::eq("id", "1")];
            let found = adapter.find_one("user", &by_id, None).await.unwrap();
            assert_eq!(found.and_then(|row| row.get("name").cloned()), Some(Value::from("Ada")));

            let updated = adapter
                .update("user", &by_id, record! { "name" => "Grace" })
                .await
                .unwrap()
                .unwrap();
            assert_eq!(updated.get("id"), Some(&Value::from("1")));
            assert_eq!(updated.get("name"), Some(&Value::from("Grace")));
            assert_eq!(adapter.count("user", &by_id).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_find_many_default_limit() {
        let backend = Arc::new(InMemoryBackend::new());
        let adapter = Adapter::from_parts(
            AdapterConfig::default(),
            DatabaseOptions {
                default_find_many_limit: 2,
                ..DatabaseOptions::default()
            },
            schema(),
            backend,
        );
        for n in 0..3 {
            adapter
                .create(
                    "user",
                    record! { "name" => format!("u{}", n), "email" => "e@x.io" },
                    CreateOptions::default(),
                )
                .await
                .unwrap();
        }

        let page = adapter
            .find_many("user", FindManyOptions::default())
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let sorted = adapter
            .find_many(
                "user",
                FindManyOptions {
                    sort_by: Some(SortBy::desc("name")),
                    limit: Some(10),
                    ..FindManyOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[0].get("name"), Some(&Value::from("u2")));
    }
}
