//! Chatstore
//!
//! Stores chat, message, vote, document and suggestion records through one
//! uniform contract while the storage backend varies by deployment.
//!
//! # Crates
//!
//! - **common** - values, schema registry, hook traits, configuration, errors
//! - **adapter** - the transform pipeline, id policy and the bundled drivers

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub use chatstore_adapter as adapter;
pub use chatstore_common as common;

use std::sync::Arc;
use tracing::info;

use chatstore_adapter::{build_adapter, chat_schema, Adapter, BackendDriver, DomainOptions, InMemoryBackend};
use chatstore_common::config::StoreConfig;
use chatstore_common::error::Result;

/// Chat data store: the chat schema bound to one backend driver
#[derive(Debug, Clone)]
pub struct ChatStore {
    config: StoreConfig,
    adapter: Adapter,
}

impl ChatStore {
    /// Open a store over an explicit driver
    ///
    /// # Errors
    /// Returns a configuration error if the adapter options are inconsistent.
    pub fn open(config: StoreConfig, backend: Arc<dyn BackendDriver>) -> Result<Self> {
        info!(adapter = %config.adapter.adapter_id, "Opening chat store");

        let options = DomainOptions::new(chat_schema()).with_database(config.database.clone());
        let adapter = build_adapter(config.adapter.clone(), backend, options)?;

        Ok(Self { config, adapter })
    }

    /// Open a store backed by process memory
    ///
    /// # Errors
    /// Returns a configuration error if the adapter options are inconsistent.
    pub fn in_memory(config: StoreConfig) -> Result<Self> {
        Self::open(config, Arc::new(InMemoryBackend::new()))
    }

    /// The adapter every operation goes through
    #[must_use]
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatstore_adapter::CreateOptions;
    use chatstore_common::config::DatabaseOptions;
    use chatstore_common::{record, Value, Where};

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = ChatStore::in_memory(StoreConfig::default()).unwrap();
        let user = store
            .adapter()
            .create("user", record! { "email" => "a@x.io" }, CreateOptions::default())
            .await
            .unwrap();
        let user_id = user.get("id").cloned().unwrap();

        store
            .adapter()
            .create(
                "chat",
                record! { "title" => "Hello", "userId" => user_id.clone() },
                CreateOptions::default(),
            )
            .await
            .unwrap();

        let count = store
            .adapter()
            .count("chat", &[Where::eq("userId", user_id)])
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_numeric_ids_rejected_without_support() {
        let mut config = StoreConfig::default();
        config.adapter.supports_numeric_ids = false;
        config.database = DatabaseOptions {
            use_number_id: true,
            ..DatabaseOptions::default()
        };

        let err = ChatStore::in_memory(config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_numeric_id_store() {
        let mut config = StoreConfig::default();
        config.database.use_number_id = true;
        let store = ChatStore::in_memory(config).unwrap();

        let user = store
            .adapter()
            .create("user", record! { "email" => "a@x.io" }, CreateOptions::default())
            .await
            .unwrap();
        assert_eq!(user.get("id"), Some(&Value::from("1")));
    }
}
