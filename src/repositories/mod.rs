pub mod session_result_repository;
pub mod test_repository;

pub use session_result_repository::{MongoSessionResultRepository, SessionResultRepository};
pub use test_repository::{MongoTestRepository, TestRepository};
