pub mod code_buffer;
pub mod exam_service;
pub mod exam_session;
pub mod execution_service;
pub mod hint_policy;
pub mod hint_service;
pub mod scoring_service;
pub mod session_timer;
pub mod test_runner;
