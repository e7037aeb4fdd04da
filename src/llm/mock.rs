//! Deterministic in-process provider for tests. Embeddings are char-trigram
//! bags hashed into a fixed number of dimensions, so lexically close texts
//! score high under cosine similarity and unrelated texts score near zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::errors::ApiError;

const MOCK_DIMENSIONS: usize = 64;

pub struct MockProvider {
    pub embed_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
    pub chat_response: String,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_response("mock recommendation")
    }

    pub fn with_response(response: &str) -> Self {
        Self {
            embed_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            chat_response: response.to_string(),
        }
    }

    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn embed_text(text: &str) -> Vec<f32> {
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        let mut dims = vec![0.0f32; MOCK_DIMENSIONS];

        if chars.len() < 3 {
            let bucket = fnv1a(&chars.iter().collect::<String>()) as usize % MOCK_DIMENSIONS;
            dims[bucket] = 1.0;
            return dims;
        }

        for trigram in chars.windows(3) {
            let key: String = trigram.iter().collect();
            let bucket = fnv1a(&key) as usize % MOCK_DIMENSIONS;
            dims[bucket] += 1.0;
        }

        dims
    }
}

fn fnv1a(input: &str) -> u32 {
    input
        .bytes()
        .fold(2166136261u32, |hash, byte| {
            (hash ^ byte as u32).wrapping_mul(16777619)
        })
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        *self.last_prompt.lock().unwrap() = Some(prompt);
        Ok(self.chat_response.clone())
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|text| Self::embed_text(text)).collect())
    }
}
