use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::Language,
        dto::{request::ExecuteRequestDto, response::ExecuteResponseDto},
    },
};

static LINE_REGEX: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"line\D*(\d+)").expect("LINE_REGEX is a valid regex pattern"));

static JAVA_LOCATION_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"Main\.java:(\d+)").expect("JAVA_LOCATION_REGEX is a valid regex pattern")
});

/// Raw result of one remote execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Runs a complete source unit once. No retries.
    async fn execute(&self, language: Language, source: String) -> AppResult<ExecutionOutput>;
}

/// Client for a Piston-compatible `/execute` endpoint.
pub struct PistonExecutor {
    client: reqwest::Client,
    api_url: String,
}

impl PistonExecutor {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.execution_api_url.clone(),
            Duration::from_secs(config.execution_timeout_secs),
        )
    }
}

#[async_trait]
impl CodeExecutor for PistonExecutor {
    async fn execute(&self, language: Language, source: String) -> AppResult<ExecutionOutput> {
        let request = ExecuteRequestDto::new(language, source);

        let response = self.client.post(&self.api_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read response body".to_string());
            return Err(AppError::ExecutionError(format!("HTTP {}: {}", status, body)));
        }

        let body: ExecuteResponseDto = response.json().await?;
        output_from_response(body)
    }
}

fn output_from_response(body: ExecuteResponseDto) -> AppResult<ExecutionOutput> {
    if let Some(compile) = body.compile.filter(|c| c.failed()) {
        let stderr = if compile.stderr.trim().is_empty() {
            compile.stdout
        } else {
            compile.stderr
        };
        return Ok(ExecutionOutput {
            stdout: String::new(),
            stderr,
            exit_code: compile.code,
        });
    }

    let run = body
        .run
        .ok_or_else(|| AppError::ExecutionError("Response has no run stage".to_string()))?;

    Ok(ExecutionOutput {
        stdout: run.stdout,
        stderr: run.stderr,
        exit_code: run.code,
    })
}

/// Best-effort source line of an error, relative to the attendee's code.
pub fn extract_error_line(stderr: &str, language: Language) -> Option<u32> {
    let raw = LINE_REGEX
        .captures(stderr)
        .or_else(|| match language {
            Language::Java => JAVA_LOCATION_REGEX.captures(stderr),
            Language::Python => None,
        })
        .and_then(|c| c[1].parse::<u32>().ok())?;

    let offset = language.harness_line_offset();
    if raw > offset {
        Some(raw - offset)
    } else {
        Some(raw)
    }
}
