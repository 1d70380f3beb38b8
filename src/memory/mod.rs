//! Per-session conversation memory.
//!
//! Each session keeps a sliding window of its most recent turns. The
//! session map itself is a bounded cache so an open-ended stream of
//! session ids cannot grow memory without limit: least-recently-used
//! sessions fall out once capacity is reached, and idle sessions expire
//! after the configured TTL. An evicted session simply starts over with
//! empty history on its next question.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tokio::sync::Mutex;

const MIN_WINDOW: usize = 1;
const MAX_WINDOW: usize = 50;

/// One answered question and its reply, oldest first in history order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

struct SessionHistory {
    turns: VecDeque<ConversationTurn>,
    window: usize,
}

impl SessionHistory {
    fn new(window: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(window),
            window,
        }
    }

    fn push(&mut self, turn: ConversationTurn) {
        while self.turns.len() >= self.window {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }
}

pub struct SessionMemory {
    sessions: Cache<String, Arc<Mutex<SessionHistory>>>,
    window: usize,
}

impl SessionMemory {
    pub fn new(window: usize, max_sessions: u64, idle_ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle_ttl)
            .build();

        Self {
            sessions,
            window: window.clamp(MIN_WINDOW, MAX_WINDOW),
        }
    }

    /// Turns kept per session after clamping.
    pub fn window(&self) -> usize {
        self.window
    }

    fn entry(&self, session_id: &str) -> Arc<Mutex<SessionHistory>> {
        self.sessions.get_with(session_id.to_string(), || {
            Arc::new(Mutex::new(SessionHistory::new(self.window)))
        })
    }

    /// Record a completed turn. Appends to the same session are serialized
    /// by the per-session lock; different sessions do not contend.
    pub async fn append(&self, session_id: &str, question: &str, answer: &str) {
        let entry = self.entry(session_id);
        let mut history = entry.lock().await;
        history.push(ConversationTurn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    /// History for a session, oldest turn first. Unknown sessions yield
    /// an empty history without creating an entry.
    pub async fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        match self.sessions.get(session_id) {
            Some(entry) => entry.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    pub async fn turn_count(&self, session_id: &str) -> usize {
        match self.sessions.get(session_id) {
            Some(entry) => entry.lock().await.turns.len(),
            None => 0,
        }
    }

    pub fn session_count(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(window: usize) -> SessionMemory {
        SessionMemory::new(window, 100, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn history_is_empty_for_unknown_session() {
        let memory = memory(10);
        assert!(memory.history("nobody").await.is_empty());
        assert_eq!(memory.session_count(), 0);
    }

    #[tokio::test]
    async fn append_keeps_turns_in_order() {
        let memory = memory(10);
        memory.append("s1", "first question", "first answer").await;
        memory.append("s1", "second question", "second answer").await;

        let history = memory.history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "first question");
        assert_eq!(history[1].answer, "second answer");
    }

    #[tokio::test]
    async fn window_evicts_oldest_turn() {
        let memory = memory(3);
        for i in 0..4 {
            memory
                .append("s1", &format!("q{}", i), &format!("a{}", i))
                .await;
        }

        let history = memory.history("s1").await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].question, "q1");
        assert_eq!(history[2].question, "q3");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let memory = memory(10);
        memory.append("alice@example.com", "qa", "aa").await;
        memory.append("bob@example.com", "qb", "ab").await;

        let alice = memory.history("alice@example.com").await;
        let bob = memory.history("bob@example.com").await;
        assert_eq!(alice.len(), 1);
        assert_eq!(bob.len(), 1);
        assert_eq!(alice[0].question, "qa");
        assert_eq!(bob[0].question, "qb");
        assert_eq!(memory.session_count(), 2);
    }

    #[tokio::test]
    async fn window_is_clamped_to_valid_range() {
        let memory = memory(0);
        assert_eq!(memory.window(), 1);

        memory.append("s1", "q0", "a0").await;
        memory.append("s1", "q1", "a1").await;
        let history = memory.history("s1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "q1");
    }
}
