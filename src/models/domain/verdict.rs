use serde::{Deserialize, Serialize};

use crate::models::domain::language::Language;

/// Classification of a single test case execution.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestCaseOutcome {
    Passed {
        output: String,
    },
    Mismatch {
        expected: String,
        actual: String,
    },
    Error {
        message: String,
        line: Option<u32>,
    },
}

impl TestCaseOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, TestCaseOutcome::Passed { .. })
    }
}

/// Outcome of running one question's code against all of its test cases.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionVerdict {
    pub passed_count: u32,
    pub total_count: u32,
    pub score_percent: u32,
    pub all_passed: bool,
    pub code: String,
    pub language: Language,
    pub outcomes: Vec<TestCaseOutcome>,
}

impl QuestionVerdict {
    pub fn from_outcomes(code: String, language: Language, outcomes: Vec<TestCaseOutcome>) -> Self {
        let total_count = outcomes.len() as u32;
        let passed_count = outcomes.iter().filter(|o| o.passed()).count() as u32;

        Self {
            passed_count,
            total_count,
            score_percent: score_percent(passed_count, total_count),
            all_passed: total_count > 0 && passed_count == total_count,
            code,
            language,
            outcomes,
        }
    }
}

/// `round(100 * passed / total)`, half away from zero; 0 for an empty run.
pub fn score_percent(passed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * passed as f64 / total as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass() -> TestCaseOutcome {
        TestCaseOutcome::Passed {
            output: "3".to_string(),
        }
    }

    fn mismatch() -> TestCaseOutcome {
        TestCaseOutcome::Mismatch {
            expected: "3".to_string(),
            actual: "4".to_string(),
        }
    }

    #[test]
    fn all_passing_outcomes_score_full_marks() {
        let verdict =
            QuestionVerdict::from_outcomes("code".into(), Language::Python, vec![pass(), pass()]);

        assert!(verdict.all_passed);
        assert_eq!(verdict.score_percent, 100);
        assert_eq!(verdict.passed_count, 2);
    }

    #[test]
    fn partial_outcomes_round_percentage() {
        let verdict = QuestionVerdict::from_outcomes(
            "code".into(),
            Language::Python,
            vec![pass(), mismatch(), mismatch()],
        );

        assert!(!verdict.all_passed);
        assert_eq!(verdict.score_percent, 33);
        assert_eq!(score_percent(2, 3), 67);
        assert_eq!(score_percent(1, 2), 50);
        assert_eq!(score_percent(0, 0), 0);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = TestCaseOutcome::Error {
            message: "boom".to_string(),
            line: Some(2),
        };
        let json = serde_json::to_value(&outcome).expect("outcome should serialize");

        assert_eq!(json["status"], "error");
        assert_eq!(json["line"], 2);
    }
}
