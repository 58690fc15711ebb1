//! Scripted fakes shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use kira::assistant::Assistant;
use kira::config::Config;
use kira_core::embedding::Embedder;
use kira_core::llm::LanguageModel;
use kira_core::models::ChatMessage;
use kira_core::prompt::GROUNDED_PREAMBLE;

/// One dimension per keyword plus a small constant, so texts sharing no
/// keyword score near zero and texts sharing one score high.
const KEYWORDS: [&str; 5] = ["sabana", "biblioteca", "arepa", "horario", "semestre"];

#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = KEYWORDS
        .iter()
        .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
        .collect();
    v.push(0.1);
    v
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("embedding provider unavailable");
        }
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

/// Counts grounded and conversational calls and answers with fixed text.
#[derive(Default)]
pub struct ScriptedModel {
    pub grounded_calls: AtomicUsize,
    pub conversational_calls: AtomicUsize,
    pub fail: AtomicBool,
    pub last_grounded_prompt: Mutex<Option<String>>,
    pub last_conversation: Mutex<Vec<ChatMessage>>,
}

pub const GROUNDED_ANSWER: &str = "Según el documento, la biblioteca abre a las 7.";
pub const CONVERSATIONAL_ANSWER: &str = "¡Hola Monito! Con gusto te ayudo.";

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("model returned 503");
        }
        let first = &messages[0].content;
        if first.starts_with(GROUNDED_PREAMBLE) {
            self.grounded_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_grounded_prompt.lock().unwrap() = Some(first.clone());
            Ok(GROUNDED_ANSWER.to_string())
        } else {
            self.conversational_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_conversation.lock().unwrap() = messages.to_vec();
            Ok(CONVERSATIONAL_ANSWER.to_string())
        }
    }
}

pub struct Harness {
    pub assistant: Arc<Assistant>,
    pub embedder: Arc<KeywordEmbedder>,
    pub model: Arc<ScriptedModel>,
}

pub fn test_config(uploads: &Path) -> Config {
    let mut config = Config::default();
    config.uploads.dir = uploads.to_path_buf();
    config
}

pub fn harness(uploads: &Path) -> Harness {
    harness_with(test_config(uploads))
}

pub fn harness_with(config: Config) -> Harness {
    let embedder = Arc::new(KeywordEmbedder::default());
    let model = Arc::new(ScriptedModel::default());
    let assistant = Assistant::new(&config, embedder.clone(), model.clone()).unwrap();
    Harness {
        assistant: Arc::new(assistant),
        embedder,
        model,
    }
}
