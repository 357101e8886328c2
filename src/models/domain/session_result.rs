use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::{language::Language, verdict::QuestionVerdict};

/// Final, immutable record of one attendee's attempt at one test.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub id: String,
    pub attendee_id: String,
    pub test_id: String,
    pub test_name: String,
    /// Keyed by question id. Only attempted questions appear.
    pub question_results: BTreeMap<String, QuestionResult>,
    pub total_questions: u32,
    pub attempted_questions: u32,
    pub overall_score: u32,
    pub language: Language,
    pub submitted_at: DateTime<Utc>,
    pub auto_submit: bool,
    /// Seconds.
    pub time_spent: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub passed: bool,
    pub code: String,
    pub passed_tests: u32,
    pub total_tests: u32,
    pub score: u32,
}

impl From<&QuestionVerdict> for QuestionResult {
    fn from(verdict: &QuestionVerdict) -> Self {
        QuestionResult {
            passed: verdict.all_passed,
            code: verdict.code.clone(),
            passed_tests: verdict.passed_count,
            total_tests: verdict.total_count,
            score: verdict.score_percent,
        }
    }
}
