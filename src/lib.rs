//! Schema-validated user record store.
//!
//! # Intention
//!
//! - Declare the `user` table once and let every store validate against it.
//! - Offer `insert` and `find_first` over an injected SQLite connection, with an
//!   in-memory store of identical behavior for tests.
//!
//! # Architectural Boundaries
//!
//! - The store never parses connection strings; [`config`] and [`db`] do that
//!   for the binary.
//! - No updates, deletes, migrations or multi-statement transactions.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{StoreError, Violation};
pub use model::{NewUser, User};
pub use schema::{user_table, SchemaVariant, TableDefinition};
pub use store::{MemoryUserStore, RecordStore, SqliteUserStore, StoreOptions};
