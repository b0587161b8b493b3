//! Token normalization shared by the embedder and catalog lookup.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "does", "for",
        "from", "have", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my", "of",
        "on", "or", "our", "so", "that", "the", "their", "them", "there", "these", "this",
        "to", "was", "we", "what", "when", "where", "which", "who", "will", "with", "you",
        "your", "yours", "any", "some", "about", "would", "could", "should", "am", "been",
        "than", "then", "they", "us", "get", "got", "has", "had", "did", "just", "also",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Strip a plural `s` so "hoodies" and "hoodie" share a token.
pub fn stem(token: &str) -> String {
    if token.len() > 3
        && token.ends_with('s')
        && !token.ends_with("ss")
        && !token.ends_with("us")
        && !token.ends_with("is")
    {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

/// Lowercase, split on anything that is not alphanumeric, drop stop words
/// and single characters, then stem.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() > 1 && !is_stop_word(t))
        .map(|t| stem(&t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_punctuation() {
        let tokens = tokenize("What's your return policy?");
        assert_eq!(tokens, vec!["return", "policy"]);
    }

    #[test]
    fn test_tokenize_stems_plurals() {
        let tokens = tokenize("Red Hoodies in XL");
        assert_eq!(tokens, vec!["red", "hoodie", "xl"]);
    }

    #[test]
    fn test_stem_keeps_short_and_double_s() {
        assert_eq!(stem("xs"), "xs");
        assert_eq!(stem("dress"), "dress");
        assert_eq!(stem("sizes"), "size");
    }

    #[test]
    fn test_tokenize_splits_hyphenated_numbers() {
        let tokens = tokenize("30-day window");
        assert_eq!(tokens, vec!["30", "day", "window"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("the and of").is_empty());
    }
}
