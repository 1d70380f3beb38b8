//! Retrieval-augmented answer engine.
//!
//! Orchestrates one question end to end: reformulate against session
//! history, embed, retrieve from the knowledge base, synthesize an
//! answer and record the turn. The engine never fails the caller;
//! degraded and transient conditions come back as fixed answers with an
//! explanatory debug context, and memory stays untouched on failure.

use std::sync::Arc;

use tracing::{debug, warn};

use super::prompts;
use super::store::DocumentStore;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::memory::{ConversationTurn, SessionMemory};

/// Returned when the knowledge base or the model backend was never
/// initialized.
pub const UNAVAILABLE_ANSWER: &str =
    "I'm sorry, but my knowledge base is currently unavailable.";

/// Returned when a normally-working pipeline hits a transient failure.
pub const TRANSIENT_ANSWER: &str =
    "I'm sorry, I ran into a problem while answering your question. Please try again.";

#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    /// Formatted history and retrieved documents, for observability only.
    pub debug_context: String,
}

pub struct RagEngine {
    memory: Arc<SessionMemory>,
    documents: Option<Arc<dyn DocumentStore>>,
    provider: Option<Arc<dyn LlmProvider>>,
    chat_model: String,
    embedding_model: String,
    collection: String,
}

impl RagEngine {
    pub fn new(
        memory: Arc<SessionMemory>,
        documents: Option<Arc<dyn DocumentStore>>,
        provider: Option<Arc<dyn LlmProvider>>,
        chat_model: String,
        embedding_model: String,
        collection: String,
    ) -> Self {
        Self {
            memory,
            documents,
            provider,
            chat_model,
            embedding_model,
            collection,
        }
    }

    /// Whether both the knowledge base and the model backend are wired up.
    pub fn ready(&self) -> bool {
        self.documents.is_some() && self.provider.is_some()
    }

    /// Answer one question for a session. Infallible by contract: every
    /// failure mode maps to a fixed answer plus a debug context.
    pub async fn answer(&self, session_id: &str, question: &str, k: usize) -> RagAnswer {
        let (Some(documents), Some(provider)) = (self.documents.clone(), self.provider.clone())
        else {
            warn!("knowledge base not initialized, returning degraded answer");
            return RagAnswer {
                answer: UNAVAILABLE_ANSWER.to_string(),
                debug_context: "Error: Not initialized.".to_string(),
            };
        };

        match self
            .answer_inner(documents.as_ref(), provider.as_ref(), session_id, question, k)
            .await
        {
            Ok(answer) => answer,
            Err(err) => {
                warn!("answer pipeline failed for session '{}': {}", session_id, err);
                RagAnswer {
                    answer: TRANSIENT_ANSWER.to_string(),
                    debug_context: format!("Error: {}", err),
                }
            }
        }
    }

    async fn answer_inner(
        &self,
        documents: &dyn DocumentStore,
        provider: &dyn LlmProvider,
        session_id: &str,
        question: &str,
        k: usize,
    ) -> Result<RagAnswer, ApiError> {
        let history = self.memory.history(session_id).await;

        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            self.reformulate(provider, &history, question).await?
        };
        debug!("standalone question for session '{}': {}", session_id, standalone);

        let embeddings = provider
            .embed(std::slice::from_ref(&standalone), &self.embedding_model)
            .await?;
        let query_embedding = embeddings
            .first()
            .ok_or_else(|| ApiError::internal("embedding backend returned no vector"))?;

        // An empty result set is not an error; the answer prompt tells the
        // model how to decline when the context has nothing relevant.
        let matches = documents
            .search(query_embedding, k, Some(&self.collection))
            .await?;
        let contents: Vec<String> = matches
            .into_iter()
            .map(|result| result.document.content)
            .collect();
        debug!("retrieved {} documents for session '{}'", contents.len(), session_id);

        let mut messages = vec![ChatMessage::system(prompts::answer_system_prompt(
            &prompts::format_context(&contents),
        ))];
        messages.extend(history_messages(&history));
        messages.push(ChatMessage::user(question));

        let answer = provider
            .chat(ChatRequest::new(messages), &self.chat_model)
            .await?
            .trim()
            .to_string();

        self.memory.append(session_id, question, &answer).await;

        // The debug context reflects what went into the prompt, so it uses
        // the history from before the turn recorded just above.
        let debug_context = prompts::debug_context(&history, &contents);

        Ok(RagAnswer {
            answer,
            debug_context,
        })
    }

    /// Rewrite a follow-up into a standalone question using the session
    /// history. An empty rewrite falls back to the original question.
    async fn reformulate(
        &self,
        provider: &dyn LlmProvider,
        history: &[ConversationTurn],
        question: &str,
    ) -> Result<String, ApiError> {
        let mut messages = vec![ChatMessage::system(prompts::CONTEXTUALIZE_QUESTION_PROMPT)];
        messages.extend(history_messages(history));
        messages.push(ChatMessage::user(question));

        let rewritten = provider
            .chat(ChatRequest::new(messages).with_temperature(0.0), &self.chat_model)
            .await?;

        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }
}

fn history_messages(turns: &[ConversationTurn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        messages.push(ChatMessage::user(turn.question.clone()));
        messages.push(ChatMessage::assistant(turn.answer.clone()));
    }
    messages
}
