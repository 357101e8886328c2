use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::dto::{
        request::{GenerateContentRequestDto, HintRequest},
        response::GenerateContentResponseDto,
    },
};

/// Number of test cases shown to the hint model.
pub const HINT_EXAMPLE_LIMIT: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hint {
    pub text: String,
    /// True when the canned hint replaced a failed model request.
    pub fallback: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HintGenerator: Send + Sync {
    async fn generate(&self, request: &HintRequest) -> AppResult<String>;
}

/// Calls a Gemini-style `generateContent` endpoint.
pub struct GeminiHintGenerator {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiHintGenerator {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.hint_api_url.clone(),
            config.hint_model.clone(),
            config.hint_api_key.clone(),
            Duration::from_secs(config.hint_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl HintGenerator for GeminiHintGenerator {
    async fn generate(&self, request: &HintRequest) -> AppResult<String> {
        let body = GenerateContentRequestDto::from_prompt(build_prompt(request));

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::HintError(format!("Hint request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read response body".to_string());
            return Err(AppError::HintError(format!("HTTP {}: {}", status, text)));
        }

        let parsed: GenerateContentResponseDto = response
            .json()
            .await
            .map_err(|e| AppError::HintError(format!("Malformed hint response: {}", e)))?;

        parsed
            .hint_text()
            .ok_or_else(|| AppError::HintError("Hint response contained no text".to_string()))
    }
}

pub fn build_prompt(request: &HintRequest) -> String {
    let examples = request
        .examples
        .iter()
        .take(HINT_EXAMPLE_LIMIT)
        .map(|case| format!("- input: {} -> expected output: {}", case.input, case.output))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Give a helpful coding hint for this problem.\n\n\
         Problem: {}\n\
         Function: {}\n\
         Example test cases:\n{}\n\n\
         Give a step-by-step hint without revealing the complete solution.",
        request.description, request.function_signature, examples
    )
}

/// Deterministic four-step hint used whenever the model cannot answer.
pub fn fallback_hint(function_signature: &str) -> String {
    format!(
        "Try working through it like this:\n\n\
         1. Make sure {} receives and uses its inputs correctly\n\
         2. Think through the logic step by step\n\
         3. Handle the edge cases\n\
         4. Check that the return value is exactly what is expected",
        function_signature
    )
}

/// Wraps a generator so that callers always get a hint.
#[derive(Clone)]
pub struct HintService {
    generator: Arc<dyn HintGenerator>,
}

impl HintService {
    pub fn new(generator: Arc<dyn HintGenerator>) -> Self {
        Self { generator }
    }

    pub async fn hint_for(&self, request: &HintRequest) -> Hint {
        match self.generator.generate(request).await {
            Ok(text) => Hint {
                text,
                fallback: false,
            },
            Err(e) => {
                log::warn!(
                    "Hint generation failed for question {}, using fallback: {}",
                    request.question_id,
                    e
                );
                Hint {
                    text: fallback_hint(&request.function_signature),
                    fallback: true,
                }
            }
        }
    }
}
