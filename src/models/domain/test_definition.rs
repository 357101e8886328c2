use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A timed test as authored by an administrator. Read-only for the session.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Minutes.
    #[validate(range(min = 1, max = 1440))]
    pub duration: u32,
    #[validate(length(min = 1), nested)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    #[validate(length(min = 1))]
    pub title: String,
    pub description: String,
    /// Target signature, e.g. `add(a, b)`.
    #[validate(length(min = 3))]
    pub function_name: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

impl TestDefinition {
    pub fn duration_seconds(&self) -> u32 {
        self.duration.saturating_mul(60)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.end_date.map(|end| end < now).unwrap_or(false)
    }

    pub fn question_index(&self, question_id: i64) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_test() -> TestDefinition {
        TestDefinition {
            id: "test-1".to_string(),
            name: "Warmup".to_string(),
            description: None,
            duration: 10,
            questions: vec![Question {
                id: 1,
                title: "Add".to_string(),
                description: "Add two numbers".to_string(),
                function_name: "add(a, b)".to_string(),
                test_cases: vec![TestCase::new("1, 2", "3")],
            }],
            end_date: None,
            created_by: None,
        }
    }

    #[test]
    fn test_definition_deserializes_from_document_shape() {
        let json = r#"{
            "id": "abc",
            "name": "Arrays",
            "duration": 30,
            "questions": [
                {
                    "id": 1,
                    "title": "Sum",
                    "description": "Sum a list",
                    "functionName": "total(xs)",
                    "testCases": [{ "input": "[1, 2]", "output": "3" }]
                }
            ]
        }"#;

        let test: TestDefinition = serde_json::from_str(json).expect("test should deserialize");

        assert_eq!(test.duration_seconds(), 1800);
        assert_eq!(test.questions[0].function_name, "total(xs)");
        assert_eq!(test.questions[0].test_cases[0].output, "3");
        assert!(test.end_date.is_none());
    }

    #[test]
    fn test_definition_validation_rejects_empty_question_list() {
        let mut test = sample_test();
        test.questions.clear();

        assert!(test.validate().is_err());
    }

    #[test]
    fn test_definition_validation_rejects_zero_duration() {
        let mut test = sample_test();
        test.duration = 0;

        assert!(test.validate().is_err());
        assert!(sample_test().validate().is_ok());
    }

    #[test]
    fn test_duration_seconds_saturates_on_unvalidated_input() {
        let mut test = sample_test();
        assert_eq!(test.duration_seconds(), test.duration * 60);

        test.duration = u32::MAX;
        assert_eq!(test.duration_seconds(), u32::MAX);
    }

    #[test]
    fn test_expiry_uses_end_date() {
        let now = Utc::now();
        let mut test = sample_test();
        assert!(!test.is_expired_at(now));

        test.end_date = Some(now - Duration::minutes(1));
        assert!(test.is_expired_at(now));

        test.end_date = Some(now + Duration::minutes(1));
        assert!(!test.is_expired_at(now));
    }
}
