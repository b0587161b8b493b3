//! Weighted keyword/pattern intent classifier.
//!
//! Every intent owns a set of weighted regexes. A message scores the sum of
//! the weights of the patterns it matches; the best-scoring intent wins,
//! ties go to the earlier intent in [`Intent::ALL`], and a message matching
//! nothing is `general_chat`.

use regex::Regex;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use stylebot_core::types::Intent;

// =============================================================================
// Compiled pattern sets (compiled once, reused across calls)
// =============================================================================

struct WeightedPattern {
    regex: Regex,
    weight: f64,
}

static INTENT_PATTERNS: LazyLock<Vec<(Intent, Vec<WeightedPattern>)>> = LazyLock::new(|| {
    let mk = |pats: &[(&str, f64)]| -> Vec<WeightedPattern> {
        pats.iter()
            .map(|(p, w)| WeightedPattern {
                regex: Regex::new(p).expect("Invalid intent regex"),
                weight: *w,
            })
            .collect()
    };

    vec![
        (
            Intent::ProductInquiry,
            mk(&[
                (r"(?i)\b(?:price|prices|pricing|cost|costs)\b", 2.0),
                (r"(?i)\bhow\s+much\b", 2.0),
                (r"(?i)\bdo\s+you\s+(?:have|sell|carry|stock|make)\b", 2.0),
                (r"(?i)\bwhat\s+(?:colou?rs|sizes|materials)\b", 2.0),
                (r"(?i)\b(?:buy|purchase|in\s+stock|available|availability)\b", 1.5),
                (
                    r"(?i)\b(?:hoodies?|t-?shirts?|tees?|shirts?|jackets?|sweatshirts?|caps?|hats?|totes?|polos?|tank\s+tops?|joggers?)\b",
                    1.5,
                ),
                (r"(?i)\b(?:xs|xl|xxl|xxxl|2xl|3xl)\b", 1.5),
                (r"(?i)\b(?:sizes?|sizing|colou?rs?|materials?|fabric|cotton)\b", 1.0),
                (r"(?i)\bproducts?\b", 1.0),
            ]),
        ),
        (
            Intent::DesignConsultation,
            mk(&[
                (r"(?i)\bdesign(?:s|ing|ed)?\b", 2.0),
                (r"(?i)\bmake\s+it\b", 2.0),
                (
                    r"(?i)\b(?:smaller|bigger|larger|brighter|darker|softer|bolder|simpler|subtler)\b",
                    2.0,
                ),
                (r"(?i)(?:\boption\s*|#)\d\b", 1.5),
                (r"(?i)\b(?:first|second|third|last)\s+one\b", 1.5),
                (r"(?i)\bon\s+the\s+(?:chest|back|front|sleeve)\b", 1.5),
                (
                    r"(?i)\b(?:minimalist|geometric|vintage|retro|cyberpunk|abstract|street\s*art|graffiti|japanese|space|nature|floral|modern)\b",
                    1.5,
                ),
                (r"(?i)\b(?:ideas?|inspiration|suggest(?:ions?)?|concepts?)\b", 1.0),
                (r"(?i)\b(?:pattern|motif|artwork|graphic|logo)\b", 1.0),
                (r"(?i)\b(?:style|aesthetic|vibe|theme)\b", 1.0),
                (r"(?i)\bcreate\b", 1.0),
                (r"(?i)\bcustom\b", 0.5),
            ]),
        ),
        (
            Intent::Faq,
            mk(&[
                (r"(?i)\b(?:return|returns|refund|refunds|exchange|exchanges)\b", 2.0),
                (r"(?i)\b(?:policy|policies)\b", 2.0),
                (r"(?i)\b(?:care\s+instructions|wash|washing|dryer|iron)\b", 1.5),
                (
                    r"(?i)\b(?:payment|pay|paypal|credit\s+card|discount|coupon|promo|gift\s+cards?)\b",
                    1.5,
                ),
                (r"(?i)\b(?:warranty|guarantee|account|minimum\s+order)\b", 1.5),
                (r"(?i)\bhow\s+do\s+i\b", 1.0),
                (r"(?i)\bcan\s+i\b", 1.0),
            ]),
        ),
        (
            Intent::Shipping,
            mk(&[
                (
                    r"(?i)\b(?:ship|ships|shipping|shipped|shipment|delivery|deliver|delivered)\b",
                    2.0,
                ),
                (r"(?i)\b(?:track|tracking)\b", 2.0),
                (r"(?i)\border\s+status\b", 2.0),
                (r"(?i)\bwhere\s+is\s+my\b", 2.0),
                (r"(?i)\b(?:express|overnight|international|customs|courier)\b", 1.5),
                (r"(?i)\b(?:arrive|arrival)\b", 1.5),
                (r"(?i)\bwhen\s+will\b", 1.5),
                (r"(?i)\bhow\s+long\b", 1.0),
            ]),
        ),
        (
            Intent::Support,
            mk(&[
                (
                    r"(?i)\b(?:problem|issue|broken|damaged|defective|wrong|error|complaint)\b",
                    2.0,
                ),
                (r"(?i)\bcancel(?:led|lation)?\b", 2.0),
                (r"(?i)\b(?:modify|change)\s+(?:my\s+)?order\b", 2.0),
                (r"(?i)\b(?:human|agent|representative)\b", 2.0),
                (r"(?i)\b(?:contact|phone|email|call)\b", 1.5),
                (r"(?i)\b(?:help|support|assist)\b", 1.0),
            ]),
        ),
        (
            Intent::GeneralChat,
            mk(&[
                (r"(?i)\b(?:hi|hello|hey|howdy|greetings)\b", 1.0),
                (r"(?i)\b(?:thanks|thank\s+you|bye|goodbye)\b", 1.0),
            ]),
        ),
    ]
});

/// A classification with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    /// Share of the total matched weight held by the winner, in [0, 1].
    /// Zero when nothing matched.
    pub confidence: f64,
}

/// Stateless intent classifier over the compiled pattern sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify `text` into exactly one intent. Never fails.
    pub fn classify(&self, text: &str) -> Intent {
        self.classify_scored(text).intent
    }

    /// Classify and report how decisive the match was.
    pub fn classify_scored(&self, text: &str) -> ClassifiedIntent {
        let scores = self.scores(text);
        let total: f64 = scores.iter().map(|(_, s)| s).sum();

        if total <= 0.0 {
            return ClassifiedIntent {
                intent: Intent::GeneralChat,
                confidence: 0.0,
            };
        }

        // Strictly-greater keeps the earliest intent on ties.
        let mut best = scores[0];
        for &(intent, score) in &scores[1..] {
            if score > best.1 {
                best = (intent, score);
            }
        }

        ClassifiedIntent {
            intent: best.0,
            confidence: (best.1 / total).clamp(0.0, 1.0),
        }
    }

    /// Per-intent scores in tie-break order.
    pub fn scores(&self, text: &str) -> Vec<(Intent, f64)> {
        INTENT_PATTERNS
            .iter()
            .map(|(intent, patterns)| {
                let score = patterns
                    .iter()
                    .filter(|p| p.regex.is_match(text))
                    .map(|p| p.weight)
                    .sum();
                (*intent, score)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new().classify(text)
    }

    #[test]
    fn test_pattern_table_covers_every_intent_in_order() {
        let order: Vec<Intent> = INTENT_PATTERNS.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, Intent::ALL.to_vec());
    }

    #[test]
    fn test_product_inquiry() {
        assert_eq!(classify("Do you have red hoodies in XL?"), Intent::ProductInquiry);
        assert_eq!(classify("How much is the organic tee?"), Intent::ProductInquiry);
        assert_eq!(classify("What sizes does the jacket come in?"), Intent::ProductInquiry);
    }

    #[test]
    fn test_faq() {
        assert_eq!(classify("What's your return policy?"), Intent::Faq);
        assert_eq!(classify("How do I wash a printed shirt? care instructions?"), Intent::Faq);
        assert_eq!(classify("Can I return a custom design?"), Intent::Faq);
    }

    #[test]
    fn test_design_consultation() {
        assert_eq!(classify("minimalist geometric pattern"), Intent::DesignConsultation);
        assert_eq!(classify("I want a red hoodie design"), Intent::DesignConsultation);
        assert_eq!(
            classify("make it smaller and on the chest"),
            Intent::DesignConsultation
        );
        assert_eq!(classify("I like option 2 but brighter"), Intent::DesignConsultation);
    }

    #[test]
    fn test_shipping() {
        assert_eq!(classify("How long does express shipping take?"), Intent::Shipping);
        assert_eq!(classify("Where is my package? tracking number?"), Intent::Shipping);
    }

    #[test]
    fn test_support() {
        assert_eq!(classify("I need to cancel"), Intent::Support);
        assert_eq!(classify("My print arrived damaged, help"), Intent::Support);
        assert_eq!(classify("Can I talk to a human?"), Intent::Support);
    }

    #[test]
    fn test_general_chat_fallback() {
        assert_eq!(classify(""), Intent::GeneralChat);
        assert_eq!(classify("   "), Intent::GeneralChat);
        assert_eq!(classify("hello there"), Intent::GeneralChat);
        assert_eq!(classify("the weather is nice"), Intent::GeneralChat);
    }

    #[test]
    fn test_no_match_has_zero_confidence() {
        let result = IntentClassifier::new().classify_scored("qwerty");
        assert_eq!(result.intent, Intent::GeneralChat);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_confidence_in_unit_range() {
        let classifier = IntentClassifier::new();
        for text in [
            "Do you have red hoodies in XL?",
            "design a shirt with shipping and returns",
            "help",
            "thanks!",
        ] {
            let result = classifier.classify_scored(text);
            assert!((0.0..=1.0).contains(&result.confidence), "{}", text);
            assert!(result.confidence > 0.0);
        }
    }

    #[test]
    fn test_single_intent_match_is_fully_confident() {
        let result = IntentClassifier::new().classify_scored("What's your return policy?");
        assert_eq!(result.intent, Intent::Faq);
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_resolve_in_enumeration_order() {
        // "price" (product, 2.0) vs "shipping" (shipping, 2.0)
        let classifier = IntentClassifier::new();
        let scores = classifier.scores("price shipping");
        let product = scores.iter().find(|(i, _)| *i == Intent::ProductInquiry).unwrap().1;
        let shipping = scores.iter().find(|(i, _)| *i == Intent::Shipping).unwrap().1;
        assert_eq!(product, shipping);
        assert_eq!(classifier.classify("price shipping"), Intent::ProductInquiry);
    }

    #[test]
    fn test_every_input_maps_to_a_known_intent() {
        let classifier = IntentClassifier::new();
        for text in ["", "?", "🙂", "xl xl xl", "a".repeat(5000).as_str(), "back"] {
            assert!(Intent::ALL.contains(&classifier.classify(text)));
        }
    }
}
