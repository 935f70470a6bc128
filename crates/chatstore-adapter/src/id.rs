//! Identifier generation policy
//!
//! [`IdPolicy::resolve`] is evaluated on every create. Rules are checked in
//! a fixed order and the first match wins:
//!
//! 1. `force_allow_id` with an `id` in the payload: use it verbatim
//! 2. a non-empty `id` in the payload: use it verbatim
//! 3. `disable_id_generation`: omit
//! 4. numeric-id mode: omit (only the backend's auto-increment produces ids)
//! 5. a configured generator (custom or UUID): call it
//! 6. generator explicitly disabled: omit
//! 7. random alphanumeric string

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;

use chatstore_common::config::{AdapterConfig, DatabaseOptions, GenerateId, DEFAULT_ID_SIZE};
use chatstore_common::hooks::{IdGenerator, IdRequest};
use chatstore_common::schema::ID_FIELD;
use chatstore_common::types::{Record, Value};

/// Why no identifier was placed in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmitReason {
    GenerationDisabled,
    NumericIds,
    GeneratorDisabled,
}

/// Outcome of the policy for one create call
#[derive(Debug, Clone, PartialEq)]
pub enum IdDecision {
    Supplied(Value),
    Generated(String),
    Omit(OmitReason),
}

impl IdDecision {
    /// Value to place in the payload, if any
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Supplied(value) => Some(value),
            Self::Generated(id) => Some(Value::String(id)),
            Self::Omit(_) => None,
        }
    }
}

#[derive(Clone)]
enum IdSource {
    Random,
    Uuid,
    Custom(Arc<dyn IdGenerator>),
    Disabled,
}

/// Resolved identifier strategy of one adapter
#[derive(Clone)]
pub struct IdPolicy {
    disable_id_generation: bool,
    use_number_id: bool,
    source: IdSource,
    size: usize,
}

impl IdPolicy {
    /// Domain options win over the adapter-level generator
    pub fn new(config: &AdapterConfig, options: &DatabaseOptions) -> Self {
        let source = match &options.generate_id {
            GenerateId::Custom(generator) => IdSource::Custom(Arc::clone(generator)),
            GenerateId::Uuid => IdSource::Uuid,
            GenerateId::Disabled => IdSource::Disabled,
            GenerateId::Default => config
                .custom_id_generator
                .as_ref()
                .map_or(IdSource::Random, |generator| IdSource::Custom(Arc::clone(generator))),
        };

        Self {
            disable_id_generation: config.disable_id_generation,
            use_number_id: options.use_number_id,
            source,
            size: DEFAULT_ID_SIZE,
        }
    }

    /// True when rules 3, 4 or 6 leave identifiers to the backend's own
    /// sequence, which hands out integers.
    pub fn backend_assigns_ids(&self) -> bool {
        self.disable_id_generation || self.use_number_id || matches!(self.source, IdSource::Disabled)
    }

    pub fn resolve(&self, model: &str, data: &Record, force_allow_id: bool) -> IdDecision {
        let supplied = data.get(ID_FIELD);

        if force_allow_id {
            if let Some(value) = supplied {
                return IdDecision::Supplied(value.clone());
            }
        }
        if let Some(value) = supplied.filter(|value| !value.is_blank()) {
            return IdDecision::Supplied(value.clone());
        }
        if self.disable_id_generation {
            return IdDecision::Omit(OmitReason::GenerationDisabled);
        }
        if self.use_number_id {
            return IdDecision::Omit(OmitReason::NumericIds);
        }

        match &self.source {
            IdSource::Custom(generator) => IdDecision::Generated(generator.generate(&IdRequest {
                model,
                size: Some(self.size),
            })),
            IdSource::Uuid => IdDecision::Generated(uuid::Uuid::new_v4().to_string()),
            IdSource::Disabled => IdDecision::Omit(OmitReason::GeneratorDisabled),
            IdSource::Random => IdDecision::Generated(generate_id(self.size)),
        }
    }
}

/// Random alphanumeric identifier of the given length
pub fn generate_id(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}
