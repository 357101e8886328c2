use serde::Serialize;

use crate::models::domain::{Language, TestCase};

/// Body of a remote execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteRequestDto {
    pub language: String,
    pub version: String,
    pub files: Vec<SourceFileDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFileDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
}

impl ExecuteRequestDto {
    pub fn new(language: Language, source: String) -> Self {
        ExecuteRequestDto {
            language: language.runtime().to_string(),
            version: language.version().to_string(),
            files: vec![SourceFileDto {
                name: language.file_name().map(str::to_string),
                content: source,
            }],
        }
    }
}

/// Body of a `generateContent` call to the hint model.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequestDto {
    pub contents: Vec<ContentDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentDto {
    pub parts: Vec<PartDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartDto {
    pub text: String,
}

impl GenerateContentRequestDto {
    pub fn from_prompt(prompt: String) -> Self {
        GenerateContentRequestDto {
            contents: vec![ContentDto {
                parts: vec![PartDto { text: prompt }],
            }],
        }
    }
}

/// What the hint model is told about a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintRequest {
    pub question_id: i64,
    pub description: String,
    pub function_signature: String,
    pub examples: Vec<TestCase>,
}
