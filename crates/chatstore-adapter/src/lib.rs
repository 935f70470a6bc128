//! Chatstore Adapter Engine
//!
//! Wraps a minimal, backend-specific CRUD driver with:
//! - Identifier generation policy
//! - Logical/physical field and table name remapping
//! - Type coercion for backends lacking booleans, dates, JSON or numeric ids
//! - User supplied transform hooks
//!
//! producing one uniform [`Adapter`] contract for every storage backend.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod coerce;
pub mod factory;
mod fields;
pub mod id;
pub mod models;
pub mod pipeline;
pub mod sql_backend;
mod where_clause;

pub use backend::{matches_where, BackendDriver, FindManyQuery, InMemoryBackend};
pub use coerce::Capabilities;
pub use factory::{build_adapter, AdapterFactory, BackendFactory, DomainOptions};
pub use id::{generate_id, IdDecision, IdPolicy, OmitReason};
pub use models::chat_schema;
pub use pipeline::{Adapter, CreateOptions, FindManyOptions};
pub use sql_backend::{SqlBackend, SqlDialect, SqlExecutor, SqlStatement};
