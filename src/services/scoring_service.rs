use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Language, QuestionResult, QuestionVerdict, SessionResult, TestDefinition},
    repositories::SessionResultRepository,
};

/// Everything needed to build a `SessionResult` from a finished attempt.
pub struct SubmissionDraft<'a> {
    pub attendee_id: &'a str,
    pub test: &'a TestDefinition,
    /// Indexed like `test.questions`; `None` for unattempted questions.
    pub verdicts: &'a [Option<QuestionVerdict>],
    pub language: Language,
    pub time_spent: u32,
    pub auto_submit: bool,
}

pub struct ScoringService {
    repository: Arc<dyn SessionResultRepository>,
}

impl ScoringService {
    pub fn new(repository: Arc<dyn SessionResultRepository>) -> Self {
        Self { repository }
    }

    /// Mean of per-question percentages over attempted questions only.
    pub fn overall_score<'a, I>(verdicts: I) -> u32
    where
        I: IntoIterator<Item = &'a QuestionVerdict>,
    {
        let (sum, count) = verdicts
            .into_iter()
            .fold((0u64, 0u64), |(sum, count), v| {
                (sum + v.score_percent as u64, count + 1)
            });

        if count == 0 {
            return 0;
        }
        (sum as f64 / count as f64).round() as u32
    }

    pub fn build_result(draft: SubmissionDraft<'_>) -> SessionResult {
        let question_results: BTreeMap<String, QuestionResult> = draft
            .test
            .questions
            .iter()
            .zip(draft.verdicts.iter())
            .filter_map(|(question, verdict)| {
                verdict
                    .as_ref()
                    .map(|v| (question.id.to_string(), QuestionResult::from(v)))
            })
            .collect();

        let overall_score = Self::overall_score(draft.verdicts.iter().flatten());

        SessionResult {
            id: Uuid::new_v4().to_string(),
            attendee_id: draft.attendee_id.to_string(),
            test_id: draft.test.id.clone(),
            test_name: draft.test.name.clone(),
            attempted_questions: question_results.len() as u32,
            question_results,
            total_questions: draft.test.questions.len() as u32,
            overall_score,
            language: draft.language,
            submitted_at: Utc::now(),
            auto_submit: draft.auto_submit,
            time_spent: draft.time_spent,
        }
    }

    pub async fn persist(&self, result: SessionResult) -> AppResult<SessionResult> {
        match self.repository.create(result).await {
            Ok(saved) => {
                log::info!(
                    "Saved result {} for attendee {} on test {} (score {}%, auto: {})",
                    saved.id,
                    saved.attendee_id,
                    saved.test_id,
                    saved.overall_score,
                    saved.auto_submit
                );
                Ok(saved)
            }
            Err(e) => {
                log::error!("Failed to save session result: {}", e);
                Err(e)
            }
        }
    }

    pub async fn has_result(&self, attendee_id: &str, test_id: &str) -> AppResult<bool> {
        Ok(self
            .repository
            .find_by_attendee_and_test(attendee_id, test_id)
            .await?
            .is_some())
    }

    pub async fn result_for(&self, attendee_id: &str, test_id: &str) -> AppResult<SessionResult> {
        self.repository
            .find_by_attendee_and_test(attendee_id, test_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No result for attendee '{}' on test '{}'",
                    attendee_id, test_id
                ))
            })
    }

    pub async fn history(&self, attendee_id: &str) -> AppResult<Vec<SessionResult>> {
        self.repository.list_by_attendee(attendee_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{Question, TestCase, TestCaseOutcome},
        repositories::session_result_repository::MockSessionResultRepository,
    };

    fn verdict(passed: u32, total: u32) -> QuestionVerdict {
        let outcomes = (0..total)
            .map(|i| {
                if i < passed {
                    TestCaseOutcome::Passed {
                        output: "ok".to_string(),
                    }
                } else {
                    TestCaseOutcome::Mismatch {
                        expected: "ok".to_string(),
                        actual: "no".to_string(),
                    }
                }
            })
            .collect();
        QuestionVerdict::from_outcomes("code".to_string(), Language::Python, outcomes)
    }

    fn test_definition(question_count: i64) -> TestDefinition {
        TestDefinition {
            id: "test-1".to_string(),
            name: "Warmup".to_string(),
            description: None,
            duration: 10,
            questions: (1..=question_count)
                .map(|id| Question {
                    id,
                    title: format!("Q{}", id),
                    description: String::new(),
                    function_name: "f(x)".to_string(),
                    test_cases: vec![TestCase::new("1", "1")],
                })
                .collect(),
            end_date: None,
            created_by: None,
        }
    }

    #[test]
    fn overall_score_averages_per_question_percentages() {
        let verdicts = [verdict(2, 2), verdict(1, 3)];
        assert_eq!(ScoringService::overall_score(verdicts.iter()), 67);
    }

    #[test]
    fn overall_score_is_zero_without_attempts() {
        assert_eq!(ScoringService::overall_score(std::iter::empty::<&QuestionVerdict>()), 0);
    }

    #[test]
    fn build_result_excludes_unattempted_questions() {
        let test = test_definition(3);
        let verdicts = vec![Some(verdict(2, 2)), None, Some(verdict(0, 2))];

        let result = ScoringService::build_result(SubmissionDraft {
            attendee_id: "ada@example.com",
            test: &test,
            verdicts: &verdicts,
            language: Language::Python,
            time_spent: 120,
            auto_submit: false,
        });

        assert_eq!(result.total_questions, 3);
        assert_eq!(result.attempted_questions, 2);
        assert_eq!(result.overall_score, 50);
        assert!(result.question_results.contains_key("1"));
        assert!(!result.question_results.contains_key("2"));
        assert!(!result.question_results["3"].passed);
        assert_eq!(result.time_spent, 120);
    }

    #[tokio::test]
    async fn persist_propagates_repository_failure() {
        let mut repository = MockSessionResultRepository::new();
        repository
            .expect_create()
            .times(1)
            .returning(|_| Err(AppError::DatabaseError("connection reset".to_string())));

        let service = ScoringService::new(Arc::new(repository));
        let test = test_definition(1);
        let result = ScoringService::build_result(SubmissionDraft {
            attendee_id: "ada@example.com",
            test: &test,
            verdicts: &[None],
            language: Language::Java,
            time_spent: 0,
            auto_submit: true,
        });

        let err = service.persist(result).await.unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }

    #[tokio::test]
    async fn result_for_reports_missing_result() {
        let mut repository = MockSessionResultRepository::new();
        repository
            .expect_find_by_attendee_and_test()
            .returning(|_, _| Ok(None));

        let service = ScoringService::new(Arc::new(repository));

        let err = service.result_for("ada", "test-1").await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!service.has_result("ada", "test-1").await.unwrap());
    }
}
