use anyhow::{Context, Result};
use tracing::info;

use user_store::config::{self, StoreConfig};
use user_store::{db, logging, NewUser, RecordStore, SqliteUserStore};

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = config::load_env_file().context("loading .env file")?;
    let config = StoreConfig::from_env().context("reading configuration")?;
    logging::init(config.log_format);
    if let Some(path) = env_file {
        info!(path = %path.display(), "loaded environment file");
    }

    let connection = db::open(&config.database).context("opening database")?;
    let store =
        SqliteUserStore::new(connection, config.schema).with_options(config.store_options());
    store
        .initialize_schema()
        .await
        .context("creating user table")?;

    store
        .insert(NewUser::new("John Doe", 43, "fake@email.com"))
        .await
        .context("inserting user")?;

    let first = store.find_first().await.context("querying first user")?;
    println!("{}", serde_json::to_string_pretty(&first)?);
    Ok(())
}
