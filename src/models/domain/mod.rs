pub mod language;
pub mod session_result;
pub mod test_definition;
pub mod verdict;
pub use language::Language;
pub use session_result::{QuestionResult, SessionResult};
pub use test_definition::{Question, TestCase, TestDefinition};
pub use verdict::{QuestionVerdict, TestCaseOutcome};
