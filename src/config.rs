use secrecy::SecretString;
use std::env;

pub const DEFAULT_EXECUTION_API_URL: &str = "https://emkc.org/api/v2/piston/execute";
pub const DEFAULT_HINT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_HINT_MODEL: &str = "gemini-2.5-flash-lite";
const DEV_HINT_API_KEY: &str = "dev_hint_api_key";

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub mongo_max_pool_size: u32,
    pub tests_collection: String,
    pub results_collection: String,
    pub execution_api_url: String,
    pub execution_timeout_secs: u64,
    pub hint_api_url: String,
    pub hint_model: String,
    pub hint_api_key: SecretString,
    pub hint_timeout_secs: u64,
}

impl Config {
    /// Loads `.env` if present, then reads the environment.
    pub fn load() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {}", err);
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "codetest-local".to_string()),
            mongo_max_pool_size: env::var("MONGO_MAX_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            tests_collection: env::var("TESTS_COLLECTION").unwrap_or_else(|_| "tests".to_string()),
            results_collection: env::var("RESULTS_COLLECTION")
                .unwrap_or_else(|_| "results".to_string()),
            execution_api_url: env::var("EXECUTION_API_URL")
                .unwrap_or_else(|_| DEFAULT_EXECUTION_API_URL.to_string()),
            execution_timeout_secs: env::var("EXECUTION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            hint_api_url: env::var("HINT_API_URL")
                .unwrap_or_else(|_| DEFAULT_HINT_API_URL.to_string()),
            hint_model: env::var("HINT_MODEL").unwrap_or_else(|_| DEFAULT_HINT_MODEL.to_string()),
            hint_api_key: SecretString::from(
                env::var("HINT_API_KEY").unwrap_or_else(|_| DEV_HINT_API_KEY.to_string()),
            ),
            hint_timeout_secs: env::var("HINT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        if self.hint_api_key.expose_secret() == DEV_HINT_API_KEY {
            panic!(
                "FATAL: HINT_API_KEY is using default value! Set HINT_API_KEY environment variable."
            );
        }

        if self.execution_timeout_secs == 0 {
            panic!("FATAL: EXECUTION_TIMEOUT_SECS must be greater than zero.");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "codetest-test".to_string(),
            mongo_max_pool_size: 4,
            tests_collection: "tests".to_string(),
            results_collection: "results".to_string(),
            execution_api_url: "http://127.0.0.1:2000/api/v2/execute".to_string(),
            execution_timeout_secs: 2,
            hint_api_url: "http://127.0.0.1:2001/v1beta/models".to_string(),
            hint_model: DEFAULT_HINT_MODEL.to_string(),
            hint_api_key: SecretString::from("test_hint_key".to_string()),
            hint_timeout_secs: 2,
        }
    }
}
