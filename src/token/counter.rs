//! Token counting backed by tiktoken encodings

use std::collections::HashMap;
use std::sync::RwLock;

use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Encoding to fall back to when a model is unknown
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// Model families tiktoken does not know about yet, mapped to the
/// encoding they actually use
const MODEL_ENCODING_MAP: &[(&str, &str)] = &[
    ("gpt-4.1", "cl100k_base"),
    ("gpt-4.1-mini", "cl100k_base"),
    ("gpt-4.1-nano", "cl100k_base"),
    ("gpt-4.1-turbo", "cl100k_base"),
    ("o3", "cl100k_base"),
    ("o3-mini", "cl100k_base"),
    ("gpt4", "cl100k_base"),
    ("gpt-4-turbo", "cl100k_base"),
    ("gpt-4o", "o200k_base"),
    ("gpt-4o-mini", "o200k_base"),
    ("claude-3-opus", "cl100k_base"),
    ("claude-3-sonnet", "cl100k_base"),
    ("claude-3-haiku", "cl100k_base"),
];

/// Token counter with a memo cache keyed by text hash.
///
/// Counting is deterministic and pure, so memoization is safe; the same
/// file is counted at baseline and again after every render round.
pub struct TokenCounter {
    bpe: CoreBPE,
    cache: RwLock<HashMap<u64, usize>>,
}

impl TokenCounter {
    /// Build a counter for a model name (e.g. `gpt-4o-mini`) or an
    /// encoding name (e.g. `cl100k_base`). Unknown names fall back to
    /// [`DEFAULT_ENCODING`].
    pub fn new(model_or_encoding: &str) -> Self {
        let bpe = Self::resolve_encoding(model_or_encoding);
        Self {
            bpe,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn resolve_encoding(name: &str) -> CoreBPE {
        let mapped = MODEL_ENCODING_MAP
            .iter()
            .find(|(model, _)| *model == name)
            .map(|(_, encoding)| *encoding);

        if let Some(encoding) = mapped {
            if let Ok(bpe) = Self::encoding_by_name(encoding) {
                return bpe;
            }
        }

        if let Ok(bpe) = tiktoken_rs::get_bpe_from_model(name) {
            return bpe;
        }

        if let Ok(bpe) = Self::encoding_by_name(name) {
            return bpe;
        }

        warn!(
            "Unknown model '{}', defaulting to {} encoding",
            name, DEFAULT_ENCODING
        );
        Self::encoding_by_name(DEFAULT_ENCODING)
            .unwrap_or_else(|_| tiktoken_rs::cl100k_base().expect("cl100k_base is bundled"))
    }

    fn encoding_by_name(name: &str) -> anyhow::Result<CoreBPE> {
        match name {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "p50k_edit" => tiktoken_rs::p50k_edit(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => Err(anyhow::anyhow!("unknown encoding: {}", other)),
        }
    }

    /// Count tokens in `text`. Empty text is 0 tokens.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let hash = Self::hash_text(text);
        if let Some(&count) = self.cache.read().unwrap().get(&hash) {
            return count;
        }

        let count = self.bpe.encode_ordinary(text).len();
        self.cache.write().unwrap().insert(hash, count);
        count
    }

    /// Truncate `text` so it fits in `max_tokens`
    pub fn truncate_to_tokens(&self, text: &str, max_tokens: usize) -> String {
        if text.is_empty() || max_tokens == 0 {
            return String::new();
        }

        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }

        self.bpe
            .decode(tokens[..max_tokens].to_vec())
            // Rough character fallback when the cut lands inside a
            // multi-byte sequence the decoder rejects
            .unwrap_or_else(|_| text.chars().take(max_tokens * 4).collect())
    }

    /// Clear the memo cache
    pub fn clear_cache(&self) {
        self.cache.write().unwrap().clear();
    }

    fn hash_text(text: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero() {
        let counter = TokenCounter::new(DEFAULT_ENCODING);
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn test_count_is_deterministic_and_cached() {
        let counter = TokenCounter::new(DEFAULT_ENCODING);
        let text = "fn main() { println!(\"hello world\"); }";
        let first = counter.count(text);
        let second = counter.count(text);
        assert!(first > 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_model_falls_back() {
        let counter = TokenCounter::new("definitely-not-a-model");
        assert!(counter.count("some text") > 0);
    }

    #[test]
    fn test_truncate_respects_limit() {
        let counter = TokenCounter::new(DEFAULT_ENCODING);
        let text = "one two three four five six seven eight nine ten";
        let truncated = counter.truncate_to_tokens(text, 3);
        assert!(counter.count(&truncated) <= 3);
        assert!(text.starts_with(&truncated));
    }

    #[test]
    fn test_truncate_noop_when_short() {
        let counter = TokenCounter::new(DEFAULT_ENCODING);
        let text = "short";
        assert_eq!(counter.truncate_to_tokens(text, 100), text);
    }
}
