// crates/ragpoint-core/src/runtime/prompts.rs
// ============================================================================
// Module: Ragpoint Prompts
// Description: Prompt templates for question answering and chat.
// Purpose: Render retrieval context and history into LLM prompts.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Three templates are used: the "stuff" prompt that packs every retrieved
//! chunk into one context block, the condense prompt that rewrites a chat
//! follow-up into a standalone question, and the context-confined prompt
//! that carries a system instruction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::document::ScoredChunk;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// System prompt used when neither the request nor the project sets one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a digital assistant, answer the question about \
                                         the following context. NEVER invent an answer, if you \
                                         don't know the answer, just say you don't know. If you \
                                         don't understand the question, just say you don't \
                                         understand.";

// ============================================================================
// SECTION: Chat History
// ============================================================================

/// One completed chat exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// User message.
    pub message: String,
    /// Assistant answer.
    pub answer: String,
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Joins chunk contents with blank lines.
#[must_use]
pub fn stuff_context(chunks: &[ScoredChunk]) -> String {
    chunks.iter().map(|chunk| chunk.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Renders the "stuff" question-answering prompt.
#[must_use]
pub fn stuff_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. If you don't \
         know the answer, just say that you don't know, don't try to make up an \
         answer.\n\n{context}\n\nQuestion: {question}\nHelpful Answer:"
    )
}

/// Renders the prompt that condenses history plus a follow-up into one question.
#[must_use]
pub fn condense_prompt(history: &[ChatTurn], question: &str) -> String {
    let history: String = history
        .iter()
        .map(|turn| format!("\nHuman: {}\nAssistant: {}", turn.message, turn.answer))
        .collect();
    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
         question to be a standalone question, in its original language.\n\nChat \
         History:{history}\nFollow Up Input: {question}\nStandalone question:"
    )
}

/// Renders the context-confined prompt with a system instruction.
#[must_use]
pub fn context_prompt(system: &str, context: &str, question: &str) -> String {
    format!(
        "{system}\nConfine your answer within the given context and do not generate the next \
         context.\nAnswer truthful answers, don't try to make up an answer.\n\nQuestion: \
         {question}\n=========\nContext: {context}\n=========\nAnswer:"
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::ChatTurn;
    use super::condense_prompt;
    use super::context_prompt;
    use super::stuff_prompt;

    #[test]
    fn stuff_prompt_embeds_context_and_question() {
        let prompt = stuff_prompt("alpha\n\nbeta", "what?");
        assert!(prompt.contains("alpha\n\nbeta\n\nQuestion: what?\nHelpful Answer:"));
    }

    #[test]
    fn condense_prompt_lists_turns_in_order() {
        let history = vec![
            ChatTurn {
                message: "hi".to_string(),
                answer: "hello".to_string(),
            },
            ChatTurn {
                message: "who are you".to_string(),
                answer: "a bot".to_string(),
            },
        ];
        let prompt = condense_prompt(&history, "and then?");
        let first = prompt.find("Human: hi").unwrap_or(usize::MAX);
        let second = prompt.find("Human: who are you").unwrap_or(0);
        assert!(first < second);
        assert!(prompt.ends_with("Follow Up Input: and then?\nStandalone question:"));
    }

    #[test]
    fn context_prompt_starts_with_system() {
        let prompt = context_prompt("Be brief.", "ctx", "q");
        assert!(prompt.starts_with("Be brief.\n"));
        assert!(prompt.contains("Context: ctx\n"));
    }
}
