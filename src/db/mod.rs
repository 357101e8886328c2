use std::time::Duration;

use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};

use crate::{config::Config, errors::AppResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the database holding tests and results.
#[derive(Clone)]
pub struct Database {
    client: Client,
    db_name: String,
}

impl Database {
    /// Connects and pings once so a bad connection string fails at startup
    /// rather than on the first submission.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let options = Self::client_options(config).await?;
        let client = Client::with_options(options)?;

        let db = Self {
            client,
            db_name: config.mongo_db_name.clone(),
        };
        db.ping().await?;

        log::info!(
            "Connected to MongoDB database '{}' (pool <= {})",
            db.db_name,
            config.mongo_max_pool_size
        );
        Ok(db)
    }

    async fn client_options(config: &Config) -> AppResult<ClientOptions> {
        let mut options = ClientOptions::parse(&config.mongo_conn_string).await?;

        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.max_pool_size = Some(config.mongo_max_pool_size.max(1));
        options.min_pool_size = Some(1);
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.server_selection_timeout = Some(CONNECT_TIMEOUT);

        Ok(options)
    }

    pub fn get_collection<T>(&self, collection_name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.client
            .database(&self.db_name)
            .collection(collection_name)
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}
