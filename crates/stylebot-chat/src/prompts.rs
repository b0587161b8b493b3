//! Prompt templates handed to the generation provider.

use stylebot_core::types::{ContextChunk, DesignSuggestion, Intent, Role, Turn};

pub const SYSTEM_PROMPT: &str = "You are StyleBot, an AI assistant for a custom clothing e-commerce platform. \
You help customers with product inquiries, design suggestions, and general questions about custom clothing. \
Be friendly, creative, and helpful. Always maintain context in conversations. \
When suggesting designs, be specific about colors, patterns, and styles.";

pub const EMPTY_HISTORY: &str = "This is the beginning of our conversation.";

pub const NO_CONTEXT: &str = "No matching information was found.";

/// Render turns as `User:` / `StyleBot:` lines.
pub fn format_history(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return EMPTY_HISTORY.to_string();
    }
    turns
        .iter()
        .map(|t| match t.role {
            Role::User => format!("User: {}", t.text),
            Role::Assistant => format!("StyleBot: {}", t.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render retrieved chunks with their source labels.
pub fn format_context(chunks: &[ContextChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }
    chunks
        .iter()
        .map(|c| format!("[{}] {}", c.source_label, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_suggestions(suggestions: &[DesignSuggestion]) -> String {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn product_inquiry(context: &str, question: &str) -> String {
    format!(
        "Based on the following product information, answer the user's question about product \
         availability, specifications, or details:\n\n\
         Product Information:\n{}\n\nUser Question: {}\n\nAnswer:",
        context, question
    )
}

pub fn faq_response(context: &str, question: &str) -> String {
    format!(
        "Based on the following FAQ information, provide a helpful response to the user's \
         question:\n\n\
         FAQ Information:\n{}\n\nUser Question: {}\n\nAnswer:",
        context, question
    )
}

pub fn design_consultation(preferences: &str, suggestions: &str, history: &str) -> String {
    format!(
        "You are helping a customer design custom clothing. Present the design ideas below \
         warmly, keeping every colour, placement and size exactly as given, and invite \
         feedback.\n\n\
         Customer Preferences: {}\n\
         Conversation Context:\n{}\n\n\
         Design Ideas:\n{}",
        preferences, history, suggestions
    )
}

pub fn general_chat(history: &str, input: &str) -> String {
    format!(
        "Continue the conversation naturally while staying in character as StyleBot, a helpful \
         AI assistant for custom clothing design.\n\n\
         Conversation History:\n{}\n\nUser: {}\n\nStyleBot:",
        history, input
    )
}

/// Choose and fill the template for one turn.
pub fn build_prompt(
    intent: Intent,
    message: &str,
    chunks: &[ContextChunk],
    suggestions: &[DesignSuggestion],
    history: &[Turn],
) -> String {
    match intent {
        Intent::ProductInquiry => product_inquiry(&format_context(chunks), message),
        Intent::Faq | Intent::Shipping | Intent::Support => {
            faq_response(&format_context(chunks), message)
        }
        Intent::DesignConsultation => design_consultation(
            message,
            &format_suggestions(suggestions),
            &format_history(history),
        ),
        Intent::GeneralChat => general_chat(&format_history(history), message),
    }
}
