//! Key-term extraction for hybrid-mode concept lookup:
//! LLM-assisted with a deterministic fallback, capped at 7 terms.

use crate::llm::{ChatClient, ChatRequest};
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_TERMS: usize = 7;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "of", "in", "on", "at", "to", "for", "and", "or", "but",
    "with", "by", "from", "as", "that", "this", "these", "those", "what", "which", "who", "whom", "how", "when", "where", "why",
    "do", "does", "did", "has", "have", "had", "it", "its", "i", "you", "we", "they",
];

fn capitalized_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][A-Za-z0-9]*(?:\s+[A-Z][A-Za-z0-9]*)*\b").unwrap())
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9]+").unwrap())
}

/// Deterministic fallback: capitalized compound runs (e.g. "New York City")
/// preserved as single terms, then remaining non-stopword words, capped at
/// [`MAX_TERMS`].
pub fn deterministic_key_terms(question: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for m in capitalized_run_regex().find_iter(question) {
        let term = m.as_str().to_string();
        let key = term.to_lowercase();
        if seen.insert(key) {
            terms.push(term);
        }
        if terms.len() >= MAX_TERMS {
            return terms;
        }
    }

    for m in word_regex().find_iter(question) {
        let word = m.as_str();
        let lower = word.to_lowercase();
        if lower.len() < 3 || STOPWORDS.contains(&lower.as_str()) {
            continue;
        }
        if seen.insert(lower.clone()) {
            terms.push(word.to_string());
        }
        if terms.len() >= MAX_TERMS {
            break;
        }
    }
    terms
}

fn parse_term_list(response: &str) -> Vec<String> {
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(response.trim()) {
        return items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).take(MAX_TERMS).collect();
    }
    response
        .split(|c: char| c == ',' || c == '\n')
        .map(|s| s.trim().trim_matches(|c: char| c == '"' || c == '-' || c == '*').trim())
        .filter(|s| !s.is_empty())
        .take(MAX_TERMS)
        .map(str::to_string)
        .collect()
}

/// Extracts up to [`MAX_TERMS`] key terms from `question`. Tries the chat
/// model first; falls back to [`deterministic_key_terms`] if the model is
/// unavailable, errors, or returns nothing usable.
pub async fn extract_key_terms(chat: &dyn ChatClient, question: &str) -> Vec<String> {
    if !chat.is_available().await {
        return deterministic_key_terms(question);
    }
    let request = ChatRequest {
        system: format!(
            "Extract up to {MAX_TERMS} key search terms from the user's question, preserving capitalized compound names as single terms. Return them as a JSON array of strings, nothing else."
        ),
        user: question.to_string(),
    };
    match chat.complete(&request).await {
        Ok(response) => {
            let terms = parse_term_list(&response);
            if terms.is_empty() {
                deterministic_key_terms(question)
            } else {
                terms
            }
        }
        Err(_) => deterministic_key_terms(question),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    #[test]
    fn preserves_capitalized_compound_sequences() {
        let terms = deterministic_key_terms("What contracts does Acme Corporation have in New York City?");
        assert!(terms.contains(&"Acme Corporation".to_string()));
        assert!(terms.contains(&"New York City".to_string()));
    }

    #[test]
    fn drops_stopwords_and_caps_at_seven() {
        let terms = deterministic_key_terms("the quick brown fox jumps over the lazy dog near the riverbank today somehow");
        assert!(terms.len() <= MAX_TERMS);
        assert!(!terms.iter().any(|t| t.eq_ignore_ascii_case("the")));
    }

    #[tokio::test]
    async fn falls_back_to_deterministic_when_chat_unavailable() {
        let chat = MockChatClient::unavailable();
        let terms = extract_key_terms(&chat, "Tell me about Acme Corporation").await;
        assert!(terms.contains(&"Acme Corporation".to_string()));
    }

    #[tokio::test]
    async fn uses_chat_response_when_available() {
        let chat = MockChatClient::available();
        chat.push_response(r#"["Acme Corporation", "risk score"]"#).await;
        let terms = extract_key_terms(&chat, "anything").await;
        assert_eq!(terms, vec!["Acme Corporation".to_string(), "risk score".to_string()]);
    }
}
