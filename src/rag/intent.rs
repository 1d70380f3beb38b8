//! Intent routing for incoming questions.
//!
//! Small talk gets a canned reply without touching retrieval or session
//! memory; everything else flows into the answer pipeline. Classification
//! is best-effort: any provider failure or unparseable model output falls
//! back to `ProductQuery`.

use std::sync::Arc;

use serde_json::Value;

use super::prompts;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Thanks,
    Goodbye,
    Identity,
    ProductQuery,
}

impl Intent {
    /// Map a classifier label onto an intent. Unknown labels are treated
    /// as product queries.
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "greeting" => Intent::Greeting,
            "thanks" => Intent::Thanks,
            "goodbye" => Intent::Goodbye,
            "identity" => Intent::Identity,
            _ => Intent::ProductQuery,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Thanks => "thanks",
            Intent::Goodbye => "goodbye",
            Intent::Identity => "identity",
            Intent::ProductQuery => "product_query",
        }
    }

    /// Canned reply for small-talk intents; `None` means the question goes
    /// through the full answer pipeline.
    pub fn small_talk_response(&self) -> Option<&'static str> {
        match self {
            Intent::Greeting => {
                Some("Hello! I am your shopping assistant. What product are you looking for today?")
            }
            Intent::Thanks => {
                Some("You're welcome! If you need anything else, feel free to ask.")
            }
            Intent::Goodbye => Some("Goodbye! Have a great day."),
            Intent::Identity => Some(
                "I am a shopping assistant. I can help you find products from the store catalog.",
            ),
            Intent::ProductQuery => None,
        }
    }
}

#[derive(Clone)]
pub struct IntentClassifier {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
}

impl IntentClassifier {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Classify a question. Never fails: missing provider, transport
    /// errors and malformed output all resolve to `ProductQuery`.
    pub async fn classify(&self, question: &str) -> Intent {
        let Some(provider) = &self.provider else {
            tracing::warn!("LLM not configured, defaulting intent to product_query");
            return Intent::ProductQuery;
        };

        let prompt = prompts::intent_prompt(question);
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]).with_temperature(0.0);

        match provider.chat(request, &self.model).await {
            Ok(output) => Self::parse_output(&output),
            Err(err) => {
                tracing::warn!("Intent classification failed, defaulting to product_query: {}", err);
                Intent::ProductQuery
            }
        }
    }

    /// Parse the model's reply, tolerating code-fence wrappers around the
    /// JSON object.
    fn parse_output(output: &str) -> Intent {
        let cleaned = strip_code_fences(output);
        match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => value
                .get("intent")
                .and_then(|v| v.as_str())
                .map(Intent::parse)
                .unwrap_or(Intent::ProductQuery),
            Err(_) => {
                tracing::warn!("Unparseable intent output {:?}, defaulting to product_query", output);
                Intent::ProductQuery
            }
        }
    }
}

fn strip_code_fences(output: &str) -> String {
    output
        .trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}
