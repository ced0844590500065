use async_trait::async_trait;
use futures::lock::Mutex;

use crate::error::{StoreError, Violation};
use crate::model::{NewUser, User};
use crate::schema::{user_table, SchemaVariant, TableDefinition};
use crate::store::RecordStore;
use crate::value::Params;

/// Insertion-ordered user records held in process memory.
pub struct MemoryUserStore {
    table: &'static TableDefinition,
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new(variant: SchemaVariant) -> Self {
        Self {
            table: user_table(variant),
            rows: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every stored record in insertion order.
    pub async fn records(&self) -> Vec<User> {
        self.rows.lock().await.clone()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new(SchemaVariant::default())
    }
}

#[async_trait]
impl RecordStore for MemoryUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let params = self.table.apply_defaults(Params::from(&new_user));
        self.table.validate(&params)?;
        let user = User::try_from(&params)?;

        let mut rows = self.rows.lock().await;
        for column in self.table.unique_columns() {
            let candidate = user.value(&column.name);
            if candidate.is_null() {
                continue;
            }
            if rows.iter().any(|row| row.value(&column.name) == candidate) {
                return Err(Violation::Duplicate {
                    column: column.name.clone(),
                }
                .into());
            }
        }
        rows.push(user.clone());
        tracing::debug!(user_id = %user.id, "inserted user into memory store");
        Ok(user)
    }

    async fn find_first(&self) -> Result<Option<User>, StoreError> {
        Ok(self.rows.lock().await.first().cloned())
    }
}
