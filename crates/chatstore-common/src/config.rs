//! Configuration types for the chatstore adapter engine

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hooks::{IdGenerator, TransformHook};

/// Length of identifiers synthesised by the default generator
pub const DEFAULT_ID_SIZE: usize = 32;

/// Limit applied to `find_many` calls that do not pass one
pub const DEFAULT_FIND_MANY_LIMIT: usize = 100;

/// Main configuration file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend capability flags and key maps
    pub adapter: AdapterConfig,
    /// Domain-level identifier and query options
    pub database: DatabaseOptions,
    /// Diagnostic output
    pub logging: LoggingConfig,
}

impl StoreConfig {
    /// Load configuration from a TOML or JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| Error::Configuration(format!("Failed to read config file: {}", e)))?;

        let config: StoreConfig = if path.as_ref().extension().map_or(false, |ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::Configuration(format!("Failed to parse TOML config: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::Configuration(format!("Failed to parse JSON config: {}", e)))?
        };

        Ok(config)
    }
}

// ============================================================================
// Adapter Capabilities
// ============================================================================

/// Capability and hook descriptor supplied once at adapter construction
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Short identifier of the backend, used in diagnostics
    pub adapter_id: String,
    /// Human readable backend name
    pub adapter_name: String,
    /// Backend stores structured values natively
    pub supports_json: bool,
    /// Backend stores temporal values natively
    pub supports_dates: bool,
    /// Backend stores booleans natively
    pub supports_booleans: bool,
    /// Backend can auto-increment numeric identifiers
    pub supports_numeric_ids: bool,
    /// Table names are the plural of model names
    pub use_plural: bool,
    /// Leave identifier generation to the backend
    pub disable_id_generation: bool,
    /// Emit a debug event for every pipeline stage
    pub debug_logs: bool,
    /// Logical field name -> physical name applied to writes and where clauses
    pub map_keys_transform_input: HashMap<String, String>,
    /// Physical name -> logical field name applied to results
    pub map_keys_transform_output: HashMap<String, String>,
    #[serde(skip)]
    pub custom_transform_input: Option<Arc<dyn TransformHook>>,
    #[serde(skip)]
    pub custom_transform_output: Option<Arc<dyn TransformHook>>,
    #[serde(skip)]
    pub custom_id_generator: Option<Arc<dyn IdGenerator>>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            adapter_id: "memory".to_string(),
            adapter_name: "Memory Adapter".to_string(),
            supports_json: false,
            supports_dates: true,
            supports_booleans: true,
            supports_numeric_ids: true,
            use_plural: false,
            disable_id_generation: false,
            debug_logs: false,
            map_keys_transform_input: HashMap::new(),
            map_keys_transform_output: HashMap::new(),
            custom_transform_input: None,
            custom_transform_output: None,
            custom_id_generator: None,
        }
    }
}

impl AdapterConfig {
    pub fn new(adapter_id: impl Into<String>) -> Self {
        let adapter_id = adapter_id.into();
        Self {
            adapter_name: adapter_id.clone(),
            adapter_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_input_key(mut self, field: impl Into<String>, physical: impl Into<String>) -> Self {
        self.map_keys_transform_input
            .insert(field.into(), physical.into());
        self
    }

    #[must_use]
    pub fn with_output_key(mut self, physical: impl Into<String>, field: impl Into<String>) -> Self {
        self.map_keys_transform_output
            .insert(physical.into(), field.into());
        self
    }

    #[must_use]
    pub fn with_custom_transform_input<H: TransformHook + 'static>(mut self, hook: H) -> Self {
        self.custom_transform_input = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_custom_transform_output<H: TransformHook + 'static>(mut self, hook: H) -> Self {
        self.custom_transform_output = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_custom_id_generator<G: IdGenerator + 'static>(mut self, generator: G) -> Self {
        self.custom_id_generator = Some(Arc::new(generator));
        self
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("adapter_id", &self.adapter_id)
            .field("adapter_name", &self.adapter_name)
            .field("supports_json", &self.supports_json)
            .field("supports_dates", &self.supports_dates)
            .field("supports_booleans", &self.supports_booleans)
            .field("supports_numeric_ids", &self.supports_numeric_ids)
            .field("use_plural", &self.use_plural)
            .field("disable_id_generation", &self.disable_id_generation)
            .field("debug_logs", &self.debug_logs)
            .field("map_keys_transform_input", &self.map_keys_transform_input)
            .field("map_keys_transform_output", &self.map_keys_transform_output)
            .field("custom_transform_input", &self.custom_transform_input.is_some())
            .field("custom_transform_output", &self.custom_transform_output.is_some())
            .field("custom_id_generator", &self.custom_id_generator.is_some())
            .finish()
    }
}

// ============================================================================
// Domain Options
// ============================================================================

/// How identifiers are produced client-side
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateId {
    /// Fixed-length random alphanumeric string
    #[default]
    Default,
    /// Random v4 UUID
    Uuid,
    /// Never generate; the backend supplies identifiers
    Disabled,
    #[serde(skip)]
    Custom(Arc<dyn IdGenerator>),
}

impl fmt::Debug for GenerateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Uuid => f.write_str("Uuid"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Identifier strategy and query defaults chosen by the application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Identifiers are backend auto-increment integers
    pub use_number_id: bool,
    pub generate_id: GenerateId,
    pub default_find_many_limit: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            use_number_id: false,
            generate_id: GenerateId::Default,
            default_find_many_limit: DEFAULT_FIND_MANY_LIMIT,
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
