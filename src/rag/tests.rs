//! Regression tests for the answer engine.
//!
//! Covers the full question lifecycle against scripted backends:
//! - `engine_tests`: degraded/transient modes, retrieval wiring,
//!   reformulation on follow-ups, memory writes
//! - `conversation_flow_tests`: multi-turn and multi-session behavior

use std::sync::Arc;
use std::time::Duration;

use crate::memory::SessionMemory;
use crate::rag::engine::{RagEngine, TRANSIENT_ANSWER, UNAVAILABLE_ANSWER};
use crate::rag::store::DocumentStore;
use crate::rag::testing::{doc, InMemoryDocumentStore, MockLlm};

struct EngineFixture {
    engine: RagEngine,
    memory: Arc<SessionMemory>,
    llm: Arc<MockLlm>,
    store: Arc<InMemoryDocumentStore>,
}

fn fixture_with_window(window: usize) -> EngineFixture {
    let memory = Arc::new(SessionMemory::new(window, 100, Duration::from_secs(600)));
    let llm = Arc::new(MockLlm::new());
    let store = Arc::new(InMemoryDocumentStore::new());
    let engine = RagEngine::new(
        memory.clone(),
        Some(store.clone()),
        Some(llm.clone()),
        "chat-model".to_string(),
        "embed-model".to_string(),
        "products".to_string(),
    );
    EngineFixture {
        engine,
        memory,
        llm,
        store,
    }
}

fn fixture() -> EngineFixture {
    fixture_with_window(10)
}

fn degraded_fixture() -> (RagEngine, Arc<SessionMemory>) {
    let memory = Arc::new(SessionMemory::new(10, 100, Duration::from_secs(600)));
    let engine = RagEngine::new(
        memory.clone(),
        None,
        None,
        String::new(),
        String::new(),
        "products".to_string(),
    );
    (engine, memory)
}

async fn seed(store: &InMemoryDocumentStore, doc_id: &str, content: &str) {
    store
        .upsert(doc("products", doc_id, content), vec![1.0, 0.0, 0.0])
        .await
        .unwrap();
}

#[cfg(test)]
mod engine_tests {
    use super::*;

    // ---------------------------------------------------------------
    // Degraded and transient modes
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn degraded_answer_without_knowledge_base() {
        let (engine, memory) = degraded_fixture();

        let result = engine.answer("a@b.com", "dog shampoo?", 3).await;

        assert_eq!(result.answer, UNAVAILABLE_ANSWER);
        assert_eq!(result.debug_context, "Error: Not initialized.");
        assert_eq!(memory.turn_count("a@b.com").await, 0);
        assert_eq!(memory.session_count(), 0);
    }

    #[tokio::test]
    async fn chat_failure_returns_transient_and_skips_memory() {
        let fx = fixture();
        seed(&fx.store, "p1", "Product: Dog Shampoo.").await;
        fx.llm.script_chat_error("model exploded");

        let result = fx.engine.answer("s1", "dog shampoo?", 3).await;

        assert_eq!(result.answer, TRANSIENT_ANSWER);
        assert!(result.debug_context.starts_with("Error:"));
        assert_eq!(fx.memory.turn_count("s1").await, 0);
    }

    #[tokio::test]
    async fn search_failure_returns_transient() {
        let fx = fixture();
        fx.store.fail_searches();

        let result = fx.engine.answer("s1", "dog shampoo?", 3).await;

        assert_eq!(result.answer, TRANSIENT_ANSWER);
        assert_eq!(fx.memory.turn_count("s1").await, 0);
    }

    // ---------------------------------------------------------------
    // Retrieval and synthesis
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn dog_shampoo_question_appends_one_turn_with_both_documents() {
        let fx = fixture();
        seed(
            &fx.store,
            "p1",
            "Product: Gentle Dog Shampoo. Brand: PetCo. Price: $499.",
        )
        .await;
        seed(
            &fx.store,
            "p2",
            "Product: Herbal Dog Shampoo. Brand: FurCare. Price: $350.",
        )
        .await;
        fx.llm
            .script_chat("We carry two dog shampoos: PetCo Gentle and FurCare Herbal.");

        let result = fx
            .engine
            .answer("a@b.com", "I'm looking for a dog shampoo", 3)
            .await;

        assert_eq!(
            result.answer,
            "We carry two dog shampoos: PetCo Gentle and FurCare Herbal."
        );
        assert!(result.debug_context.contains("Gentle Dog Shampoo"));
        assert!(result.debug_context.contains("Herbal Dog Shampoo"));
        assert_eq!(fx.memory.turn_count("a@b.com").await, 1);

        let history = fx.memory.history("a@b.com").await;
        assert_eq!(history[0].question, "I'm looking for a dog shampoo");
    }

    #[tokio::test]
    async fn empty_retrieval_still_answers_and_records_the_turn() {
        let fx = fixture();
        fx.llm
            .script_chat("I'm sorry, I don't have information about that.");

        let result = fx.engine.answer("s1", "quantum toasters?", 3).await;

        assert_eq!(result.answer, "I'm sorry, I don't have information about that.");
        assert!(result.debug_context.ends_with("--- Retrieved Context ---\n"));
        assert_eq!(fx.memory.turn_count("s1").await, 1);
    }

    #[tokio::test]
    async fn k_limits_the_documents_in_context() {
        let fx = fixture();
        seed(&fx.store, "p1", "Doc one").await;
        seed(&fx.store, "p2", "Doc two").await;
        seed(&fx.store, "p3", "Doc three").await;

        let result = fx.engine.answer("s1", "anything", 2).await;

        assert!(result.debug_context.contains("Doc one"));
        assert!(result.debug_context.contains("Doc two"));
        assert!(!result.debug_context.contains("Doc three"));
    }

    // ---------------------------------------------------------------
    // History-aware reformulation
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn first_turn_skips_reformulation() {
        let fx = fixture();
        fx.llm.script_chat("First answer.");

        fx.engine.answer("s1", "first question", 3).await;

        assert_eq!(fx.llm.chat_calls(), 1);
        assert_eq!(fx.llm.embed_inputs(), vec!["first question".to_string()]);
    }

    #[tokio::test]
    async fn followup_retrieves_with_the_standalone_question() {
        let fx = fixture();
        fx.llm.script_chat("First answer.");
        fx.engine.answer("s1", "I'm looking for a dog shampoo", 3).await;

        fx.llm.script_chat("Which dog shampoo is the cheapest?");
        fx.llm.script_chat("The FurCare Herbal is the cheapest.");
        let result = fx.engine.answer("s1", "which one is cheapest?", 3).await;

        assert_eq!(result.answer, "The FurCare Herbal is the cheapest.");
        assert_eq!(fx.llm.chat_calls(), 3);
        assert_eq!(
            fx.llm.embed_inputs().last().map(String::as_str),
            Some("Which dog shampoo is the cheapest?")
        );
    }

    #[tokio::test]
    async fn blank_reformulation_falls_back_to_the_original_question() {
        let fx = fixture();
        fx.llm.script_chat("First answer.");
        fx.engine.answer("s1", "dog shampoo?", 3).await;

        fx.llm.script_chat("   ");
        fx.llm.script_chat("Second answer.");
        let result = fx.engine.answer("s1", "and in blue?", 3).await;

        assert_eq!(result.answer, "Second answer.");
        assert_eq!(
            fx.llm.embed_inputs().last().map(String::as_str),
            Some("and in blue?")
        );
    }
}

#[cfg(test)]
mod conversation_flow_tests {
    use super::*;

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let fx = fixture();

        fx.llm.script_chat("Answer for alice.");
        fx.engine.answer("alice", "dog shampoo?", 3).await;
        fx.llm.script_chat("Answer for bob.");
        fx.engine.answer("bob", "cat food?", 3).await;

        // bob's first turn has no history, so no reformulation happened
        assert_eq!(fx.llm.chat_calls(), 2);
        assert_eq!(fx.memory.turn_count("alice").await, 1);
        assert_eq!(fx.memory.turn_count("bob").await, 1);

        let alice = fx.memory.history("alice").await;
        assert_eq!(alice[0].answer, "Answer for alice.");
    }

    #[tokio::test]
    async fn window_bounds_turns_across_questions() {
        let fx = fixture_with_window(1);

        fx.llm.script_chat("A1");
        fx.engine.answer("s1", "q1", 3).await;

        fx.llm.script_chat("standalone q2");
        fx.llm.script_chat("A2");
        fx.engine.answer("s1", "q2", 3).await;

        assert_eq!(fx.memory.turn_count("s1").await, 1);
        let history = fx.memory.history("s1").await;
        assert_eq!(history[0].question, "q2");
    }

    #[tokio::test]
    async fn debug_context_shows_prior_turns() {
        let fx = fixture();

        fx.llm.script_chat("We have PetCo Gentle.");
        fx.engine
            .answer("s1", "I'm looking for a dog shampoo", 3)
            .await;

        fx.llm.script_chat("How much is the PetCo Gentle shampoo?");
        fx.llm.script_chat("It costs $499.");
        let result = fx.engine.answer("s1", "how much is it?", 3).await;

        assert!(result
            .debug_context
            .contains("Human: I'm looking for a dog shampoo"));
        assert!(result.debug_context.contains("AI: We have PetCo Gentle."));
        assert!(!result.debug_context.contains("Human: how much is it?"));
    }
}
