use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{MongoSessionResultRepository, MongoTestRepository},
    services::{
        exam_service::ExamService,
        exam_session::SessionServices,
        execution_service::PistonExecutor,
        hint_service::GeminiHintGenerator,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub exam_service: Arc<ExamService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let test_repository = Arc::new(MongoTestRepository::new(&db, &config.tests_collection));
        test_repository.ensure_indexes().await?;

        let result_repository = Arc::new(MongoSessionResultRepository::new(
            &db,
            &config.results_collection,
        ));
        result_repository.ensure_indexes().await?;

        let services = SessionServices {
            executor: Arc::new(PistonExecutor::from_config(&config)?),
            hint_generator: Arc::new(GeminiHintGenerator::from_config(&config)?),
            results: result_repository,
        };
        let exam_service = Arc::new(ExamService::new(test_repository, services));

        Ok(Self {
            exam_service,
            config: Arc::new(config),
        })
    }
}
