//! Prompt templates and context formatting for the answer pipeline.

use crate::memory::ConversationTurn;

/// System prompt for answer synthesis. `{context}` is replaced with the
/// retrieved document contents.
pub const ANSWER_PROMPT_TEMPLATE: &str = "You are an expert sales assistant and a friendly conversationalist for the store.
Your main goal is to answer product-related questions based on the 'Product context' provided.
However, you should also use the chat history to answer conversational questions and remember user details like their name.

- If the user asks a product question, base your answer on the 'Product context'.
- If the user asks a conversational question (e.g., \"do you remember my name?\"), base your answer on the chat history.
- If the product context is not relevant to the question, ignore it.

**Product context for the current question:**
{context}
";

/// Instruction for rewriting a follow-up question into a standalone one.
pub const CONTEXTUALIZE_QUESTION_PROMPT: &str = "Given a chat history and the latest user question which might reference context in the chat history, formulate a standalone question which can be understood without the chat history. Do NOT answer the question, just reformulate it if needed and otherwise return it as is.";

/// Classification prompt. `{question}` is replaced with the user question;
/// the model must reply with a one-field JSON object.
pub const INTENT_CLASSIFICATION_PROMPT: &str = "Your task is to classify the user's intent based on their question.
You must classify the question into one of the following categories:
- \"greeting\": For hellos, good mornings, etc.
- \"goodbye\": For goodbyes, see you later, etc.
- \"thanks\": For expressions of gratitude.
- \"identity\": For questions about who you are or what you can do.
- \"product_query\": For any question related to products, prices, availability, or searches. This is the default category.

The user's question is:
\"{question}\"

You must respond ONLY with a JSON object containing the classification, like this:
{\"intent\": \"category_name\"}
";

pub fn intent_prompt(question: &str) -> String {
    INTENT_CLASSIFICATION_PROMPT.replace("{question}", question)
}

pub fn answer_system_prompt(context: &str) -> String {
    ANSWER_PROMPT_TEMPLATE.replace("{context}", context)
}

/// Retrieved document contents joined the way the answer prompt and the
/// debug trace expect them.
pub fn format_context(contents: &[String]) -> String {
    contents.join("\n---\n")
}

pub fn format_history(turns: &[ConversationTurn]) -> String {
    let mut lines = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        lines.push(format!("Human: {}", turn.question));
        lines.push(format!("AI: {}", turn.answer));
    }
    lines.join("\n")
}

/// Debug trace returned with every generated answer: the history the
/// prompt saw, then the retrieved context verbatim.
pub fn debug_context(turns: &[ConversationTurn], contents: &[String]) -> String {
    format!(
        "--- Chat History Sent to Prompt ---\n{}\n\n--- Retrieved Context ---\n{}",
        format_history(turns),
        format_context(contents)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_prompt_embeds_context() {
        let prompt = answer_system_prompt("Product: Dog Shampoo.");
        assert!(prompt.contains("Product: Dog Shampoo."));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn intent_prompt_embeds_question() {
        let prompt = intent_prompt("do you have dog shampoo?");
        assert!(prompt.contains("\"do you have dog shampoo?\""));
        assert!(prompt.contains("product_query"));
    }

    #[test]
    fn history_formats_as_alternating_lines() {
        let turns = vec![
            ConversationTurn {
                question: "Hi, my name is Alex.".to_string(),
                answer: "Hello Alex!".to_string(),
            },
            ConversationTurn {
                question: "Any dog shampoo?".to_string(),
                answer: "Yes, two options.".to_string(),
            },
        ];

        let formatted = format_history(&turns);
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Human: Hi, my name is Alex.");
        assert_eq!(lines[1], "AI: Hello Alex!");
        assert_eq!(lines[3], "AI: Yes, two options.");
    }

    #[test]
    fn debug_context_has_both_sections() {
        let trace = debug_context(&[], &["doc one".to_string(), "doc two".to_string()]);
        assert!(trace.starts_with("--- Chat History Sent to Prompt ---"));
        assert!(trace.contains("--- Retrieved Context ---"));
        assert!(trace.contains("doc one\n---\ndoc two"));
    }
}
