use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Language, Question, QuestionVerdict, TestCase, TestCaseOutcome},
    services::execution_service::{extract_error_line, CodeExecutor, ExecutionOutput},
};

/// Runs a question's test cases against a code buffer and aggregates a verdict.
#[derive(Clone)]
pub struct TestCaseRunner {
    executor: Arc<dyn CodeExecutor>,
}

impl TestCaseRunner {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }

    /// Rejects runs that would waste a remote call.
    pub fn precheck(question: &Question, language: Language, code: &str) -> AppResult<()> {
        if question.test_cases.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Question {} has no test cases",
                question.id
            )));
        }

        if language.is_untouched(code, &question.function_name) {
            return Err(AppError::ValidationError(
                "Write some code before running the test cases".to_string(),
            ));
        }

        Ok(())
    }

    /// Executes every test case in order. `on_case` sees each outcome as it
    /// lands; the verdict is only built once all cases have finished.
    pub async fn run<F>(
        &self,
        question: &Question,
        language: Language,
        code: &str,
        mut on_case: F,
    ) -> QuestionVerdict
    where
        F: FnMut(usize, &TestCaseOutcome) + Send,
    {
        let mut outcomes = Vec::with_capacity(question.test_cases.len());

        for (index, case) in question.test_cases.iter().enumerate() {
            let outcome = self.run_case(question, language, code, index, case).await;
            on_case(index, &outcome);
            outcomes.push(outcome);
        }

        let verdict = QuestionVerdict::from_outcomes(code.to_string(), language, outcomes);
        log::info!(
            "Question {} verdict: {}/{} passed ({}%)",
            question.id,
            verdict.passed_count,
            verdict.total_count,
            verdict.score_percent
        );
        verdict
    }

    async fn run_case(
        &self,
        question: &Question,
        language: Language,
        code: &str,
        index: usize,
        case: &TestCase,
    ) -> TestCaseOutcome {
        let source = match language.build_harness(code, &question.function_name, &case.input) {
            Ok(source) => source,
            Err(e) => {
                log::warn!(
                    "Question {} test case {}: harness could not be built: {}",
                    question.id,
                    index,
                    e
                );
                return TestCaseOutcome::Error {
                    message: e.to_string(),
                    line: None,
                };
            }
        };

        match self.executor.execute(language, source).await {
            Ok(output) => classify(&output, &case.output, language),
            Err(e) => {
                log::error!(
                    "Question {} test case {}: execution failed: {}",
                    question.id,
                    index,
                    e
                );
                TestCaseOutcome::Error {
                    message: e.to_string(),
                    line: None,
                }
            }
        }
    }
}

/// Pass iff stderr is empty and trimmed stdout equals trimmed expected text.
pub fn classify(output: &ExecutionOutput, expected: &str, language: Language) -> TestCaseOutcome {
    if !output.stderr.trim().is_empty() {
        return TestCaseOutcome::Error {
            message: output.stderr.clone(),
            line: extract_error_line(&output.stderr, language),
        };
    }

    let actual = output.stdout.trim();
    let expected = expected.trim();

    if actual == expected {
        TestCaseOutcome::Passed {
            output: actual.to_string(),
        }
    } else {
        TestCaseOutcome::Mismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::execution_service::MockCodeExecutor;
    use mockall::Sequence;

    const CODE: &str = "def add(a, b):\n    return a + b";

    fn question(cases: Vec<(&str, &str)>) -> Question {
        Question {
            id: 1,
            title: "Add".to_string(),
            description: "Add two numbers".to_string(),
            function_name: "add(a, b)".to_string(),
            test_cases: cases
                .into_iter()
                .map(|(input, output)| TestCase::new(input, output))
                .collect(),
        }
    }

    fn stdout(text: &str) -> ExecutionOutput {
        ExecutionOutput {
            stdout: text.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    #[test]
    fn classify_trims_before_comparing() {
        let outcome = classify(&stdout("3\n"), " 3 ", Language::Python);
        assert_eq!(
            outcome,
            TestCaseOutcome::Passed {
                output: "3".to_string()
            }
        );
    }

    #[test]
    fn classify_is_string_equality_only() {
        let outcome = classify(&stdout("3.0"), "3", Language::Python);
        assert_eq!(
            outcome,
            TestCaseOutcome::Mismatch {
                expected: "3".to_string(),
                actual: "3.0".to_string()
            }
        );
    }

    #[test]
    fn classify_stderr_as_error_even_when_stdout_matches() {
        let output = ExecutionOutput {
            stdout: "3".to_string(),
            stderr: "  File \"file0.code\", line 2\nSyntaxError".to_string(),
            exit_code: Some(1),
        };

        match classify(&output, "3", Language::Python) {
            TestCaseOutcome::Error { message, line } => {
                assert!(message.contains("SyntaxError"));
                assert_eq!(line, Some(2));
            }
            other => panic!("expected error outcome, got {:?}", other),
        }
    }

    #[test]
    fn precheck_rejects_template_and_empty_questions() {
        let q = question(vec![("1, 2", "3")]);
        let template = Language::Python.starter_template(&q.function_name);

        assert!(TestCaseRunner::precheck(&q, Language::Python, &template).is_err());
        assert!(TestCaseRunner::precheck(&q, Language::Python, CODE).is_ok());

        let empty = question(vec![]);
        let err = TestCaseRunner::precheck(&empty, Language::Python, CODE).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn all_cases_passing_scores_full_marks() {
        let mut executor = MockCodeExecutor::new();
        let mut seq = Sequence::new();
        executor
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, source| source.contains("print(add(1, 2))"))
            .returning(|_, _| Ok(stdout("3\n")));
        executor
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, source| source.contains("print(add(2, 2))"))
            .returning(|_, _| Ok(stdout("4\n")));

        let runner = TestCaseRunner::new(Arc::new(executor));
        let q = question(vec![("1, 2", "3"), ("2, 2", "4")]);

        let verdict = runner.run(&q, Language::Python, CODE, |_, _| {}).await;

        assert!(verdict.all_passed);
        assert_eq!(verdict.score_percent, 100);
        assert_eq!(verdict.code, CODE);
    }

    #[tokio::test]
    async fn mismatches_reduce_the_score() {
        let mut executor = MockCodeExecutor::new();
        let mut responses = vec!["3", "0", "0"].into_iter();
        executor
            .expect_execute()
            .times(3)
            .returning(move |_, _| Ok(stdout(responses.next().unwrap_or_default())));

        let runner = TestCaseRunner::new(Arc::new(executor));
        let q = question(vec![("1, 2", "3"), ("2, 2", "4"), ("3, 3", "6")]);

        let verdict = runner.run(&q, Language::Python, CODE, |_, _| {}).await;

        assert!(!verdict.all_passed);
        assert_eq!(verdict.passed_count, 1);
        assert_eq!(verdict.score_percent, 33);
    }

    #[tokio::test]
    async fn transport_failure_only_fails_its_own_case() {
        let mut executor = MockCodeExecutor::new();
        let mut calls = 0;
        executor.expect_execute().times(3).returning(move |_, _| {
            calls += 1;
            if calls == 2 {
                Err(AppError::ExecutionError("HTTP 502 Bad Gateway".to_string()))
            } else {
                Ok(stdout("3"))
            }
        });

        let runner = TestCaseRunner::new(Arc::new(executor));
        let q = question(vec![("1, 2", "3"), ("1, 2", "3"), ("1, 2", "3")]);
        let mut seen = Vec::new();

        let verdict = runner
            .run(&q, Language::Python, CODE, |index, outcome| {
                seen.push((index, outcome.passed()))
            })
            .await;

        assert_eq!(seen, vec![(0, true), (1, false), (2, true)]);
        assert_eq!(verdict.passed_count, 2);
        match &verdict.outcomes[1] {
            TestCaseOutcome::Error { message, line } => {
                assert!(message.contains("502"));
                assert_eq!(*line, None);
            }
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unparseable_signature_fails_without_remote_call() {
        let mut executor = MockCodeExecutor::new();
        executor.expect_execute().never();

        let runner = TestCaseRunner::new(Arc::new(executor));
        let mut q = question(vec![("1", "1")]);
        q.function_name = "not a signature".to_string();

        let verdict = runner.run(&q, Language::Python, CODE, |_, _| {}).await;

        assert_eq!(verdict.passed_count, 0);
        assert!(!verdict.outcomes[0].passed());
    }
}
