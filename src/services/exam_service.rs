use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Language, SessionResult},
    repositories::TestRepository,
    services::{
        exam_session::{ExamSession, SessionServices},
        scoring_service::ScoringService,
    },
};

/// Entry point for attendees: opens sessions and reads back stored results.
pub struct ExamService {
    tests: Arc<dyn TestRepository>,
    scoring: ScoringService,
    services: SessionServices,
}

impl ExamService {
    pub fn new(tests: Arc<dyn TestRepository>, services: SessionServices) -> Self {
        Self {
            tests,
            scoring: ScoringService::new(services.results.clone()),
            services,
        }
    }

    /// Loads the test, refuses expired tests and repeat attempts, and starts
    /// the countdown.
    pub async fn start_session(
        &self,
        attendee_id: &str,
        test_id: &str,
        language: Language,
    ) -> AppResult<ExamSession> {
        let session = self.open_session(attendee_id, test_id, language).await?;
        session.start_timer();
        Ok(session)
    }

    /// Same checks as `start_session`, but the caller drives the clock.
    pub async fn open_session(
        &self,
        attendee_id: &str,
        test_id: &str,
        language: Language,
    ) -> AppResult<ExamSession> {
        if attendee_id.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Attendee id must not be empty".to_string(),
            ));
        }

        let test = self
            .tests
            .find_by_id(test_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test '{}' not found", test_id)))?;
        test.validate()?;

        if test.is_expired_at(Utc::now()) {
            return Err(AppError::ValidationError(format!(
                "Test '{}' is no longer accepting attempts",
                test_id
            )));
        }

        if self.scoring.has_result(attendee_id, test_id).await? {
            return Err(AppError::AlreadyExists(format!(
                "Attendee '{}' already submitted test '{}'",
                attendee_id, test_id
            )));
        }

        log::info!(
            "Opening session for attendee {} on test {} ({} questions, {} min, {})",
            attendee_id,
            test.id,
            test.questions.len(),
            test.duration,
            language
        );

        Ok(ExamSession::new(
            attendee_id,
            test,
            language,
            self.services.clone(),
        ))
    }

    pub async fn result_for(&self, attendee_id: &str, test_id: &str) -> AppResult<SessionResult> {
        self.scoring.result_for(attendee_id, test_id).await
    }

    /// Newest first.
    pub async fn history(&self, attendee_id: &str) -> AppResult<Vec<SessionResult>> {
        self.scoring.history(attendee_id).await
    }
}
