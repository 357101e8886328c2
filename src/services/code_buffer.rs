use crate::models::domain::{Language, Question};

/// Per-question source buffers, indexed like the test's question list.
/// A buffer is seeded with the language's starter template on first access.
#[derive(Clone, Debug)]
pub struct CodeBufferStore {
    language: Language,
    signatures: Vec<String>,
    buffers: Vec<Option<String>>,
}

impl CodeBufferStore {
    pub fn new(language: Language, questions: &[Question]) -> Self {
        Self {
            language,
            signatures: questions.iter().map(|q| q.function_name.clone()).collect(),
            buffers: vec![None; questions.len()],
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn get_code(&mut self, index: usize) -> Option<String> {
        let signature = self.signatures.get(index)?;
        let language = self.language;
        let buffer = self.buffers.get_mut(index)?;
        Some(
            buffer
                .get_or_insert_with(|| language.starter_template(signature))
                .clone(),
        )
    }

    /// Replaces the buffer. Returns false for an unknown index.
    pub fn set_code(&mut self, index: usize, code: String) -> bool {
        match self.buffers.get_mut(index) {
            Some(buffer) => {
                *buffer = Some(code);
                true
            }
            None => false,
        }
    }

    /// Discards every buffer; each is re-seeded from the new language's template.
    pub fn switch_language(&mut self, language: Language) {
        self.language = language;
        self.buffers.iter_mut().for_each(|buffer| *buffer = None);
    }
}
