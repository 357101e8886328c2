use serde::Deserialize;

/// Response of the remote execution service. Compiled languages report a
/// `compile` stage; `run` is absent when compilation failed.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponseDto {
    #[serde(default)]
    pub compile: Option<RunOutputDto>,
    #[serde(default)]
    pub run: Option<RunOutputDto>,
}

impl RunOutputDto {
    pub fn failed(&self) -> bool {
        match self.code {
            Some(code) => code != 0,
            None => !self.stderr.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOutputDto {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponseDto {
    #[serde(default)]
    pub candidates: Vec<CandidateDto>,
    #[serde(default)]
    pub output_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateDto {
    pub content: Option<CandidateContentDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContentDto {
    #[serde(default)]
    pub parts: Vec<CandidatePartDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePartDto {
    pub text: Option<String>,
}

impl GenerateContentResponseDto {
    /// First non-blank text of the first candidate, else `outputText`.
    pub fn hint_text(&self) -> Option<String> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.clone())
            .or_else(|| self.output_text.clone())
            .filter(|text| !text.trim().is_empty())
    }
}
