//! Create/read access to user records.
//!
//! Both stores validate through the same [`TableDefinition`](crate::schema::TableDefinition)
//! and return the same results for the same sequence of calls; the in-memory
//! one exists so callers can be tested without a database.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{NewUser, User};

pub use memory::MemoryUserStore;
pub use sqlite::{SqliteUserStore, StoreOptions};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new user with a freshly generated id and return it.
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// The earliest inserted user, or `None` when the table is empty.
    async fn find_first(&self) -> Result<Option<User>, StoreError>;
}
