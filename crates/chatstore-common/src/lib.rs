//! Chatstore Common Types and Utilities
//!
//! Shared values, schema metadata, hook interfaces, configuration and
//! error handling for the chatstore adapter engine.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod hooks;
pub mod schema;
pub mod types;

pub use config::{AdapterConfig, DatabaseOptions, GenerateId, StoreConfig};
pub use error::{Error, Result};
pub use hooks::{Action, FieldValidator, IdGenerator, IdRequest, TransformContext, TransformHook, ValueTransform};
pub use schema::{FieldAttribute, FieldType, ModelSchema, SchemaRegistry, ID_FIELD};
pub use types::{CleanedWhere, Connector, Operator, Record, SortBy, SortDirection, Value, Where};
