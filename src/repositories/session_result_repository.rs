use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::SessionResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionResultRepository: Send + Sync {
    /// Inserts the result. Fails with `AlreadyExists` when the attendee
    /// already has a result for the test.
    async fn create(&self, result: SessionResult) -> AppResult<SessionResult>;
    async fn find_by_attendee_and_test(
        &self,
        attendee_id: &str,
        test_id: &str,
    ) -> AppResult<Option<SessionResult>>;
    async fn list_by_attendee(&self, attendee_id: &str) -> AppResult<Vec<SessionResult>>;
}

pub struct MongoSessionResultRepository {
    collection: Collection<SessionResult>,
}

impl MongoSessionResultRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for results collection");

        let attendee_test_index = IndexModel::builder()
            .keys(doc! { "attendeeId": 1, "testId": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("attendee_test_unique".to_string())
                    .build(),
            )
            .build();

        let test_index = IndexModel::builder()
            .keys(doc! { "testId": 1 })
            .options(IndexOptions::builder().name("test_id".to_string()).build())
            .build();

        self.collection.create_index(attendee_test_index).await?;
        self.collection.create_index(test_index).await?;

        log::info!("Successfully created indexes for results collection");
        Ok(())
    }
}

#[async_trait]
impl SessionResultRepository for MongoSessionResultRepository {
    async fn create(&self, result: SessionResult) -> AppResult<SessionResult> {
        self.collection.insert_one(&result).await?;
        Ok(result)
    }

    async fn find_by_attendee_and_test(
        &self,
        attendee_id: &str,
        test_id: &str,
    ) -> AppResult<Option<SessionResult>> {
        let result = self
            .collection
            .find_one(doc! {
                "attendeeId": attendee_id,
                "testId": test_id
            })
            .await?;
        Ok(result)
    }

    async fn list_by_attendee(&self, attendee_id: &str) -> AppResult<Vec<SessionResult>> {
        let results = self
            .collection
            .find(doc! { "attendeeId": attendee_id })
            .sort(doc! { "submittedAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(results)
    }
}
