//! Adapter construction
//!
//! Configuration is validated once, before any operation can run. A
//! misconfigured adapter is never handed out.

use std::sync::Arc;

use tracing::info;

use chatstore_common::config::{AdapterConfig, DatabaseOptions};
use chatstore_common::error::{Error, Result};
use chatstore_common::schema::{SchemaRegistry, ID_FIELD};

use crate::backend::BackendDriver;
use crate::pipeline::Adapter;

/// Application-side options: the schema plus identifier and query defaults
#[derive(Debug, Clone, Default)]
pub struct DomainOptions {
    pub schema: SchemaRegistry,
    pub database: DatabaseOptions,
}

impl DomainOptions {
    pub fn new(schema: SchemaRegistry) -> Self {
        Self {
            schema,
            database: DatabaseOptions::default(),
        }
    }

    #[must_use]
    pub fn with_database(mut self, database: DatabaseOptions) -> Self {
        self.database = database;
        self
    }
}

impl From<SchemaRegistry> for DomainOptions {
    fn from(schema: SchemaRegistry) -> Self {
        Self::new(schema)
    }
}

/// Builds the backend driver once the domain options are known
pub trait BackendFactory: Send + Sync {
    fn create_backend(&self, options: &DomainOptions) -> Result<Arc<dyn BackendDriver>>;
}

impl<F> BackendFactory for F
where
    F: Fn(&DomainOptions) -> Result<Arc<dyn BackendDriver>> + Send + Sync,
{
    fn create_backend(&self, options: &DomainOptions) -> Result<Arc<dyn BackendDriver>> {
        self(options)
    }
}

/// Binds adapter configuration to a backend factory; call
/// [`AdapterFactory::build`] once per set of domain options.
pub struct AdapterFactory {
    config: AdapterConfig,
    backend: Box<dyn BackendFactory>,
}

impl AdapterFactory {
    pub fn new<B: BackendFactory + 'static>(config: AdapterConfig, backend: B) -> Self {
        Self {
            config,
            backend: Box::new(backend),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn build(&self, options: impl Into<DomainOptions>) -> Result<Adapter> {
        let options = options.into();
        validate(&self.config, &options)?;

        let driver = self.backend.create_backend(&options)?;
        Ok(assemble(self.config.clone(), options, driver))
    }
}

/// Construct an adapter around an already built driver
pub fn build_adapter(
    config: AdapterConfig,
    backend: Arc<dyn BackendDriver>,
    options: impl Into<DomainOptions>,
) -> Result<Adapter> {
    let options = options.into();
    validate(&config, &options)?;
    Ok(assemble(config, options, backend))
}

fn assemble(config: AdapterConfig, options: DomainOptions, backend: Arc<dyn BackendDriver>) -> Adapter {
    info!(
        adapter = %config.adapter_id,
        name = %config.adapter_name,
        models = options.schema.len(),
        use_number_id = options.database.use_number_id,
        use_plural = config.use_plural,
        supports_json = config.supports_json,
        supports_dates = config.supports_dates,
        supports_booleans = config.supports_booleans,
        "Adapter initialized"
    );
    Adapter::from_parts(config, options.database, options.schema, backend)
}

fn validate(config: &AdapterConfig, options: &DomainOptions) -> Result<()> {
    if options.database.use_number_id && !config.supports_numeric_ids {
        return Err(Error::Configuration(format!(
            "adapter '{}' does not support numeric ids, but use_number_id is enabled",
            config.adapter_id
        )));
    }

    if options.database.default_find_many_limit == 0 {
        return Err(Error::Configuration(
            "default_find_many_limit must be greater than zero".to_string(),
        ));
    }

    for (model, schema) in options.schema.models() {
        for (field, attribute) in &schema.fields {
            let Some(reference) = &attribute.reference else {
                continue;
            };
            let Some((_, target)) = options.schema.resolve(&reference.model) else {
                return Err(Error::Configuration(format!(
                    "{}.{} references unknown model '{}'",
                    model, field, reference.model
                )));
            };
            if reference.field != ID_FIELD && target.get(&reference.field).is_none() {
                return Err(Error::Configuration(format!(
                    "{}.{} references unknown field '{}.{}'",
                    model, field, reference.model, reference.field
                )));
            }
        }
    }

    Ok(())
}
