use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::TestDefinition};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestDefinition>>;
}

pub struct MongoTestRepository {
    collection: Collection<TestDefinition>,
}

impl MongoTestRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for tests collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;

        log::info!("Successfully created indexes for tests collection");
        Ok(())
    }
}

#[async_trait]
impl TestRepository for MongoTestRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestDefinition>> {
        let test = self.collection.find_one(doc! { "id": id }).await?;
        Ok(test)
    }
}
