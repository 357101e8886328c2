#[cfg(test)]
pub mod fixtures {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use crate::models::domain::{Language, Question, SessionResult, TestCase, TestDefinition};

    /// Ten-minute test: `add(a, b)` with two cases, `double(x)` with three.
    pub fn two_question_test() -> TestDefinition {
        TestDefinition {
            id: "test-1".to_string(),
            name: "Warmup".to_string(),
            description: Some("Two short functions".to_string()),
            duration: 10,
            questions: vec![
                Question {
                    id: 1,
                    title: "Add".to_string(),
                    description: "Return the sum of a and b".to_string(),
                    function_name: "add(a, b)".to_string(),
                    test_cases: vec![TestCase::new("1, 2", "3"), TestCase::new("5, 5", "10")],
                },
                Question {
                    id: 2,
                    title: "Double".to_string(),
                    description: "Return x times two".to_string(),
                    function_name: "double(x)".to_string(),
                    test_cases: vec![
                        TestCase::new("1", "2"),
                        TestCase::new("2", "4"),
                        TestCase::new("3", "6"),
                    ],
                },
            ],
            end_date: None,
            created_by: Some("admin@example.com".to_string()),
        }
    }

    /// An already-persisted, empty attempt.
    pub fn stored_result(attendee_id: &str, test_id: &str) -> SessionResult {
        SessionResult {
            id: "result-1".to_string(),
            attendee_id: attendee_id.to_string(),
            test_id: test_id.to_string(),
            test_name: "Warmup".to_string(),
            question_results: BTreeMap::new(),
            total_questions: 2,
            attempted_questions: 0,
            overall_score: 0,
            language: Language::Python,
            submitted_at: Utc::now(),
            auto_submit: true,
            time_spent: 600,
        }
    }
}
