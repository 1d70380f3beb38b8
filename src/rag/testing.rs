//! Shared test doubles: a scripted model backend and an in-memory
//! document store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::{DocumentMatch, DocumentStore, StoredDocument};
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};

/// Scripted [`LlmProvider`]. Chat replies pop off a queue (falling back
/// to a canned answer when the queue runs dry); embeddings return one
/// fixed vector per input.
pub(crate) struct MockLlm {
    chat_script: Mutex<VecDeque<Result<String, String>>>,
    embedding: Vec<f32>,
    fail_embed: AtomicBool,
    chat_calls: AtomicUsize,
    embed_calls: AtomicUsize,
    embed_inputs: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::with_embedding(vec![1.0, 0.0, 0.0])
    }

    pub fn with_embedding(embedding: Vec<f32>) -> Self {
        Self {
            chat_script: Mutex::new(VecDeque::new()),
            embedding,
            fail_embed: AtomicBool::new(false),
            chat_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
            embed_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn script_chat(&self, reply: &str) {
        self.chat_script
            .lock()
            .unwrap()
            .push_back(Ok(reply.to_string()));
    }

    pub fn script_chat_error(&self, message: &str) {
        self.chat_script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn fail_embeddings(&self) {
        self.fail_embed.store(true, Ordering::SeqCst);
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Every input string passed to `embed`, in call order.
    pub fn embed_inputs(&self) -> Vec<String> {
        self.embed_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        match self.chat_script.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ApiError::internal(message)),
            None => Ok("This is a scripted answer.".to_string()),
        }
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed.load(Ordering::SeqCst) {
            return Err(ApiError::internal("embedding backend is down"));
        }
        self.embed_inputs.lock().unwrap().extend(inputs.iter().cloned());
        Ok(vec![self.embedding.clone(); inputs.len()])
    }
}

/// [`DocumentStore`] backed by a plain vector, with a switch to make
/// searches fail.
pub(crate) struct InMemoryDocumentStore {
    items: Mutex<Vec<(StoredDocument, Vec<f32>)>>,
    fail_search: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            fail_search: AtomicBool::new(false),
        }
    }

    pub fn fail_searches(&self) {
        self.fail_search.store(true, Ordering::SeqCst);
    }

    fn upsert_locked(
        items: &mut Vec<(StoredDocument, Vec<f32>)>,
        document: StoredDocument,
        embedding: Vec<f32>,
    ) {
        items.retain(|(existing, _)| {
            !(existing.doc_id == document.doc_id && existing.collection == document.collection)
        });
        items.push((document, embedding));
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upsert(&self, document: StoredDocument, embedding: Vec<f32>) -> Result<(), ApiError> {
        Self::upsert_locked(&mut self.items.lock().unwrap(), document, embedding);
        Ok(())
    }

    async fn upsert_batch(
        &self,
        items: Vec<(StoredDocument, Vec<f32>)>,
    ) -> Result<(), ApiError> {
        let mut guard = self.items.lock().unwrap();
        for (document, embedding) in items {
            Self::upsert_locked(&mut guard, document, embedding);
        }
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        collection: Option<&str>,
    ) -> Result<Vec<DocumentMatch>, ApiError> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(ApiError::internal("search backend is down"));
        }

        let items = self.items.lock().unwrap();
        let mut matches: Vec<DocumentMatch> = items
            .iter()
            .filter(|(document, _)| collection.map_or(true, |c| document.collection == c))
            .map(|(document, embedding)| DocumentMatch {
                document: document.clone(),
                score: cosine(query_embedding, embedding),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit.max(1));
        Ok(matches)
    }

    async fn count(&self, collection: Option<&str>) -> Result<usize, ApiError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|(document, _)| collection.map_or(true, |c| document.collection == c))
            .count())
    }

    async fn clear_collection(&self, collection: &str) -> Result<usize, ApiError> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|(document, _)| document.collection != collection);
        Ok(before - items.len())
    }
}

pub(crate) fn doc(collection: &str, doc_id: &str, content: &str) -> StoredDocument {
    StoredDocument {
        doc_id: doc_id.to_string(),
        collection: collection.to_string(),
        content: content.to_string(),
        metadata: None,
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + f32::EPSILON)
}
