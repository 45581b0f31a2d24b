use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z']*").expect("word pattern is valid"));

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "because", "been", "being", "could", "does", "doing",
    "from", "have", "having", "here", "into", "just", "like", "more", "most", "much", "only",
    "other", "over", "really", "some", "such", "than", "that", "their", "them", "then", "there",
    "these", "they", "this", "those", "very", "want", "were", "what", "when", "where", "which",
    "while", "with", "would", "your", "yours", "you're", "it's", "don't", "i'm", "will", "shall",
    "should", "tell", "know", "think",
];

/// Lowercased word tokens.
#[must_use]
pub fn tokens(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Lowercased tokens longer than three characters that are not stopwords.
#[must_use]
pub fn content_tokens(text: &str) -> Vec<String> {
    tokens(text)
        .into_iter()
        .filter(|token| token.len() > 3 && !STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// Whether `phrase` occurs in `text` on word boundaries, case-insensitively.
#[must_use]
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let words = tokens(text);
    let needle = tokens(phrase);
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words.windows(needle.len()).any(|window| window == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_tokens_drop_stopwords() {
        let found = content_tokens("Tell me about the ancient ruins there!");
        assert_eq!(found, vec!["ancient", "ruins"]);
    }

    #[test]
    fn phrase_match_respects_word_boundaries() {
        assert!(contains_phrase("I'm not sure about that", "not sure"));
        assert!(!contains_phrase("The mighty river", "might"));
        assert!(contains_phrase("It MIGHT rain", "might"));
    }
}
