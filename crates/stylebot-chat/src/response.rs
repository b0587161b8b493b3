//! Deterministic reply templates.
//!
//! Every turn can be answered from structured data alone: retrieved chunks,
//! catalog records or design suggestions. The agent uses these templates
//! whenever no provider is configured or the provider fails.

use std::sync::LazyLock;

use regex::Regex;

use stylebot_core::types::{ContextChunk, DesignSuggestion, Intent, Product, Turn};

use crate::prompts;

pub const FALLBACK_TEXT: &str = "I'm sorry, I'm having trouble processing your request right now. \
Please try again or contact our support team for assistance.";

pub const SUPPORT_CONTACTS: &str = "I'm here to help! For immediate assistance, you can:\n\n\
• **Chat with me** - I can answer questions about products, designs, orders, and policies\n\
• **Email us** - support@customclothingco.com (response within 24 hours)\n\
• **Call us** - 1-800-CUSTOM-1 (9 AM - 6 PM EST)\n\
• **Live chat** - Available on our website during business hours\n\n\
What specific issue can I help you with today?";

const DESIGN_DISABLED: &str = "Design suggestions are turned off right now, but I'm happy to help \
with products, orders, shipping or our policies.";

const MAX_CHUNKS_IN_TEMPLATE: usize = 2;
const MAX_PRODUCTS_IN_TEMPLATE: usize = 3;

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hi|hello|hey|howdy|greetings|good\s+(?:morning|afternoon|evening))\b")
        .expect("Invalid greeting regex")
});

static THANKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:thanks|thank\s+you|cheers|appreciate\s+it)\b").expect("Invalid thanks regex")
});

static FAREWELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:bye|goodbye|see\s+you|later)\b").expect("Invalid farewell regex")
});

/// Everything gathered for one turn before composing the reply.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub intent: Intent,
    pub message: &'a str,
    pub chunks: &'a [ContextChunk],
    pub products: &'a [Product],
    pub suggestions: &'a [DesignSuggestion],
    /// The suggestions are a refinement of an earlier batch.
    pub refined: bool,
    /// Design generation was requested but is switched off.
    pub design_disabled: bool,
    pub history: &'a [Turn],
}

/// Builds provider prompts and template replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    /// Prompt for the generation provider.
    pub fn prompt(&self, ctx: &TurnContext<'_>) -> String {
        prompts::build_prompt(
            ctx.intent,
            ctx.message,
            ctx.chunks,
            ctx.suggestions,
            ctx.history,
        )
    }

    /// Whether the provider should be consulted at all. Switched-off design
    /// turns and refinements are answered from the template directly.
    pub fn wants_provider(&self, ctx: &TurnContext<'_>) -> bool {
        !(ctx.intent == Intent::DesignConsultation && (ctx.design_disabled || ctx.refined))
    }

    /// Template reply built only from the structured data.
    pub fn template(&self, ctx: &TurnContext<'_>) -> String {
        match ctx.intent {
            Intent::ProductInquiry => product_reply(ctx.products, ctx.chunks),
            Intent::Faq => knowledge_reply(ctx.chunks).unwrap_or_else(|| {
                "I don't have details on that yet. Our support team can help: email \
                 support@customclothingco.com or call 1-800-CUSTOM-1 (9 AM - 6 PM EST)."
                    .to_string()
            }),
            Intent::Shipping => match knowledge_reply(ctx.chunks) {
                Some(text) => format!(
                    "{}\n\nIf you have an order number, I can help you track your package.",
                    text
                ),
                None => "I couldn't find shipping details for that. If you have an order \
                         number, our support team can track it for you at \
                         support@customclothingco.com."
                    .to_string(),
            },
            Intent::Support => match knowledge_reply(ctx.chunks) {
                Some(text) => format!("{}\n\n{}", text, SUPPORT_CONTACTS),
                None => SUPPORT_CONTACTS.to_string(),
            },
            Intent::DesignConsultation => {
                if ctx.design_disabled {
                    DESIGN_DISABLED.to_string()
                } else if ctx.refined {
                    refined_reply(ctx.suggestions)
                } else {
                    design_reply(ctx.suggestions)
                }
            }
            Intent::GeneralChat => general_reply(ctx.message),
        }
    }
}

/// "Street Art - a graffiti tag"
pub fn suggestion_title(s: &DesignSuggestion) -> String {
    let theme = s
        .theme
        .label()
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} - {}", theme, s.motif)
}

fn knowledge_reply(chunks: &[ContextChunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }
    let body = chunks
        .iter()
        .take(MAX_CHUNKS_IN_TEMPLATE)
        .map(|c| c.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(format!("Here's what I found:\n\n{}", body))
}

fn product_reply(products: &[Product], chunks: &[ContextChunk]) -> String {
    if products.is_empty() {
        return knowledge_reply(chunks).unwrap_or_else(|| {
            "I couldn't find a product matching that. Could you tell me a bit more about the \
             item, colour or size you're looking for?"
                .to_string()
        });
    }

    let mut lines = vec!["Here's what I found in our catalog:".to_string()];
    for p in products.iter().take(MAX_PRODUCTS_IN_TEMPLATE) {
        let mut line = format!("\n• **{}** - ${:.2}", p.name, p.price);
        if !p.colors.is_empty() {
            line.push_str(&format!("\n  Colors: {}", p.colors.join(", ")));
        }
        if !p.sizes.is_empty() {
            line.push_str(&format!("\n  Sizes: {}", p.sizes.join(", ")));
        }
        if !p.material.is_empty() {
            line.push_str(&format!("\n  Material: {}", p.material));
        }
        if !p.lead_time.is_empty() {
            line.push_str(&format!("\n  Lead time: {}", p.lead_time));
        }
        lines.push(line);
    }
    lines.push("\nWould you like to start a custom design on one of these?".to_string());
    lines.join("\n")
}

fn design_reply(suggestions: &[DesignSuggestion]) -> String {
    let mut parts = vec![
        "I'd love to help you create the perfect design! Based on your preferences, here are \
         some creative suggestions:"
            .to_string(),
    ];
    for (i, s) in suggestions.iter().enumerate() {
        parts.push(format!("\n**Option {}: {}**", i + 1, suggestion_title(s)));
        parts.push(s.description.clone());
    }
    parts.push(
        "\nWhich design catches your eye? I can refine any of these based on your feedback!"
            .to_string(),
    );
    parts.join("\n")
}

fn refined_reply(suggestions: &[DesignSuggestion]) -> String {
    match suggestions.first() {
        Some(s) => format!(
            "Great feedback! I've refined the design based on your input:\n\n**{}**\n{}\n\n\
             How does this look? I can make further adjustments if needed!",
            suggestion_title(s),
            s.description
        ),
        None => FALLBACK_TEXT.to_string(),
    }
}

fn general_reply(message: &str) -> String {
    if THANKS_RE.is_match(message) {
        "You're welcome! Is there anything else I can help you with?".to_string()
    } else if FAREWELL_RE.is_match(message) {
        "Thanks for stopping by! Come back any time you want to design something new.".to_string()
    } else if GREETING_RE.is_match(message) {
        "Hello! I'm StyleBot. I can help you find products, design something custom, or answer \
         questions about orders and shipping. What would you like to do?"
            .to_string()
    } else {
        "I'm here to help with custom clothing! I can suggest designs, answer product questions, \
         or help with orders and shipping. What are you looking for today?"
            .to_string()
    }
}
