use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ToSql};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{NewUser, User};
use crate::schema::{columns, quote_ident, user_table, SchemaVariant, TableDefinition};
use crate::store::RecordStore;
use crate::value::{Params, Value};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(value) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*value)),
            Value::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            Value::Uuid(value) => {
                ToSqlOutput::Owned(rusqlite::types::Value::Text(value.hyphenated().to_string()))
            }
        })
    }
}

/// SQL statement with named parameters (`:column`)
#[derive(Debug, Clone, PartialEq)]
struct SqlQuery {
    statement: String,
    params: Params,
}

impl SqlQuery {
    fn new(statement: String) -> Self {
        Self {
            statement,
            params: Params::new(),
        }
    }

    fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    fn log(&self) {
        info!(statement = %self.statement, params = ?self.params.values, "executing statement");
    }

    fn execute(&self, conn: &Connection) -> rusqlite::Result<usize> {
        let names: Vec<(String, &Value)> = self
            .params
            .values
            .iter()
            .map(|(name, value)| (format!(":{name}"), value))
            .collect();
        let bindings: Vec<(&str, &dyn ToSql)> = names
            .iter()
            .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
            .collect();
        let mut stmt = conn.prepare_cached(&self.statement)?;
        stmt.execute(bindings.as_slice())
    }
}

/// Tuning for [`SqliteUserStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long an operation may wait for another connection's lock before
    /// failing with [`StoreError::Timeout`]. Applied as the SQLite busy
    /// timeout, so a timed-out statement never writes. `None` keeps whatever
    /// busy timeout the connection already has.
    pub timeout: Option<Duration>,
    /// Log each statement and its parameters at info level.
    pub log_statements: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            log_statements: true,
        }
    }
}

/// User records in a SQLite table, over a connection supplied by the caller.
pub struct SqliteUserStore {
    table: &'static TableDefinition,
    connection: Arc<Mutex<Connection>>,
    options: StoreOptions,
}

impl SqliteUserStore {
    pub fn new(connection: Connection, variant: SchemaVariant) -> Self {
        Self {
            table: user_table(variant),
            connection: Arc::new(Mutex::new(connection)),
            options: StoreOptions::default(),
        }
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn table(&self) -> &'static TableDefinition {
        self.table
    }

    /// Create the backing table if it does not exist yet.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let query = SqlQuery::new(self.table.create_sql());
        let log_statements = self.options.log_statements;
        self.run("initialize_schema", move |conn| {
            if log_statements {
                query.log();
            }
            conn.execute_batch(&query.statement)
        })
        .await?;
        info!(table = %self.table.name, "schema initialized");
        Ok(())
    }

    /// Run `operation` against the connection on the blocking pool.
    ///
    /// The task is always awaited to completion: lock waits are bounded by
    /// SQLite itself, and a busy failure under a configured timeout becomes
    /// [`StoreError::Timeout`].
    async fn run<T, F>(&self, name: &'static str, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        let timeout = self.options.timeout;
        let task = tokio::task::spawn_blocking(move || {
            let conn = connection
                .lock()
                .map_err(|_| StoreError::Connection("connection lock poisoned".to_string()))?;
            if let Some(limit) = timeout {
                conn.busy_timeout(limit)?;
            }
            operation(&conn).map_err(|err| match timeout {
                Some(limit) if is_busy(&err) => {
                    warn!(operation = name, timeout = ?limit, "store operation timed out");
                    StoreError::Timeout(limit)
                }
                _ => StoreError::from(err),
            })
        });
        task.await
            .map_err(|err| StoreError::Database(format!("{name} task failed: {err}")))?
    }

    fn insert_query(&self, params: Params) -> SqlQuery {
        let placeholders = self
            .table
            .columns
            .iter()
            .map(|column| format!(":{}", column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.table.name),
            self.table.column_list(),
            placeholders
        );
        let params = self.table.columns.iter().fold(Params::new(), |bound, column| {
            let value = params.get(&column.name).cloned().unwrap_or(Value::Null);
            bound.with_value(&column.name, value)
        });
        SqlQuery::new(statement).with_params(params)
    }

    fn find_first_query(&self) -> SqlQuery {
        let projection = [columns::ID, columns::NAME, columns::AGE, columns::EMAIL]
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        SqlQuery::new(format!(
            "SELECT {} FROM {} ORDER BY rowid ASC LIMIT 1",
            projection,
            quote_ident(&self.table.name)
        ))
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err)))?;
    Ok(User {
        id,
        name: row.get(1)?,
        age: row.get(2)?,
        email: row.get(3)?,
    })
}

#[async_trait]
impl RecordStore for SqliteUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let params = self.table.apply_defaults(Params::from(&new_user));
        self.table.validate(&params)?;
        let user = User::try_from(&params)?;

        let query = self.insert_query(params);
        let log_statements = self.options.log_statements;
        self.run("insert", move |conn| {
            if log_statements {
                query.log();
            }
            query.execute(conn)
        })
        .await?;

        info!(user_id = %user.id, "inserted user");
        Ok(user)
    }

    async fn find_first(&self) -> Result<Option<User>, StoreError> {
        let query = self.find_first_query();
        let log_statements = self.options.log_statements;
        self.run("find_first", move |conn| {
            if log_statements {
                query.log();
            }
            let mut stmt = conn.prepare_cached(&query.statement)?;
            stmt.query_row([], row_to_user).optional()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::EnvFilter;

    use crate::logging::DEFAULT_FILTER;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().expect("capture lock").clone()).expect("utf-8 logs")
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn store() -> SqliteUserStore {
        let conn = Connection::open_in_memory().expect("in-memory database");
        SqliteUserStore::new(conn, SchemaVariant::Strict)
    }

    #[test]
    fn insert_query_binds_every_column() {
        let store = store();
        let query = store.insert_query(Params::from(&NewUser::default().with_name("John Doe")));

        assert_eq!(
            query.statement,
            "INSERT INTO \"user\" (\"id\", \"name\", \"age\", \"email\") VALUES (:id, :name, :age, :email)"
        );
        assert_eq!(query.params.values.len(), 4);
        assert_eq!(query.params.values.get(columns::AGE), Some(&Value::Null));
    }

    #[test]
    fn find_first_orders_by_insertion() {
        let query = store().find_first_query();
        assert!(query.statement.ends_with("FROM \"user\" ORDER BY rowid ASC LIMIT 1"));
    }

    #[test]
    fn uuid_values_bind_as_hyphenated_text() {
        let id = Uuid::new_v4();
        let value = Value::Uuid(id);
        let output = value.to_sql().expect("to_sql");
        assert_eq!(
            output,
            ToSqlOutput::Owned(rusqlite::types::Value::Text(id.hyphenated().to_string()))
        );
    }

    #[test]
    fn statements_are_visible_under_the_default_filter() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(DEFAULT_FILTER))
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        let new_user = NewUser::new("John Doe", 43, "fake@email.com");
        let query = store().insert_query(Params::from(&new_user));
        tracing::subscriber::with_default(subscriber, || query.log());

        let logs = captured.contents();
        assert!(logs.contains("executing statement"), "logs: {logs}");
        assert!(logs.contains("INSERT INTO"), "logs: {logs}");
        assert!(logs.contains("fake@email.com"), "logs: {logs}");
    }
}
