//! Deterministic collaborators for unit tests.

use std::{cell::RefCell, collections::HashMap};

use crate::{
    embedding::Embedder,
    error::{Error, Result},
    llm::LanguageModel,
    record::{Record, RecordKind},
};

pub const VOCAB_DIMENSION: usize = 64;

/// Bag-of-words embedder: every distinct lower-cased word gets its own
/// dimension the first time it is seen.
#[derive(Debug, Default)]
pub struct VocabEmbedder {
    vocabulary: HashMap<String, usize>,
    pub calls: usize,
}

impl Embedder for VocabEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        self.calls += 1;
        let mut vector = vec![0.0; VOCAB_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = self.vocabulary.len();
            let slot = *self
                .vocabulary
                .entry(word.to_lowercase())
                .or_insert(next);
            assert!(slot < VOCAB_DIMENSION, "test vocabulary exhausted");
            vector[slot] += 1.0;
        }
        Ok(vector)
    }
}

pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&mut self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::Collaborator("embedding service unavailable".into()))
    }
}

/// Returns the prompt it was given, recording every call.
#[derive(Debug, Default)]
pub struct EchoModel {
    pub prompts: RefCell<Vec<String>>,
}

impl LanguageModel for EchoModel {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(prompt.to_string())
    }
}

/// Always answers with the same text.
pub struct ScriptedModel(pub String);

impl LanguageModel for ScriptedModel {
    fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub struct FailingModel;

impl LanguageModel for FailingModel {
    fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::Collaborator("request timed out".into()))
    }
}

pub fn record(
    kind: RecordKind,
    name: &str,
    stack: &str,
    skills: &str,
) -> Record {
    let mut record = Record::new(kind);
    record.name = name.to_string();
    record.stack = stack.to_string();
    record.skills = skills.to_string();
    record
}
