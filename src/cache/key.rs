//! Cache key generation.

use crate::guardrails::PiiDetector;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "teach", "me", "about", "how", "to", "explain", "lesson", "plan", "for", "the",
];

const MAX_SLUG_LEN: usize = 120;
const DIGEST_HEX_LEN: usize = 12;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.,/#!$%^&*;:{}=\-_`~()?'\x22]").expect("punctuation regex"));
static NON_KEY_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("key regex"));

/// Normalized cache key for a (topic, grade, language) request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub id: String,
    pub topic: String,
    pub grade: String,
    pub language: String,
}

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub strip_stop_words: bool,
    pub strip_punctuation: bool,
    pub stop_words: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            strip_stop_words: true,
            strip_punctuation: true,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl NormalizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain normalization: trim, lowercase, collapse whitespace.
    pub fn literal() -> Self {
        Self {
            strip_stop_words: false,
            strip_punctuation: false,
            stop_words: Vec::new(),
        }
    }

    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strip_stop_words(mut self, enabled: bool) -> Self {
        self.strip_stop_words = enabled;
        self
    }

    pub fn with_strip_punctuation(mut self, enabled: bool) -> Self {
        self.strip_punctuation = enabled;
        self
    }
}

/// Derives deterministic, privacy-aware cache keys from request fields.
#[derive(Debug, Clone, Default)]
pub struct KeyNormalizer {
    config: NormalizerConfig,
    pii: PiiDetector,
}

impl KeyNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            pii: PiiDetector::new(),
        }
    }

    pub fn with_pii_detector(mut self, pii: PiiDetector) -> Self {
        self.pii = pii;
        self
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Trim, lowercase and collapse whitespace, then apply the configured stripping.
    ///
    /// Stripping never produces an empty string: when every token is a stop word the
    /// un-stripped form is returned instead.
    pub fn normalize(&self, s: &str) -> String {
        let base = collapse(&s.trim().to_lowercase());
        let mut stripped = base.clone();
        if self.config.strip_punctuation {
            // Replaced, not deleted: "1/2" and "12" must stay apart.
            stripped = collapse(&PUNCTUATION.replace_all(&stripped, " "));
        }
        if self.config.strip_stop_words {
            stripped = stripped
                .split(' ')
                .filter(|w| !self.config.stop_words.iter().any(|s| s.as_str() == *w))
                .collect::<Vec<_>>()
                .join(" ");
        }
        if stripped.is_empty() {
            base
        } else {
            stripped
        }
    }

    pub fn contains_pii(&self, text: &str) -> bool {
        self.pii.contains_pii(text)
    }

    /// Key for a request, or `None` when the raw topic contains PII.
    ///
    /// A `None` key means the request must bypass the cache in both directions.
    pub fn cache_key(&self, topic: &str, grade: &str, language: &str) -> Option<CacheKey> {
        let pii = self.pii.detect(topic);
        if !pii.is_empty() {
            let kinds: Vec<&str> = pii.iter().map(|k| k.name()).collect();
            warn!(pii = ?kinds, "PII detected in topic; skipping cache key generation");
            return None;
        }

        let topic = self.normalize(topic);
        let grade = self.normalize(grade);
        let language = self.normalize(language);

        let joined = format!("{}-{}-{}", topic, grade, language);
        let mut slug = NON_KEY_CHARS.replace_all(&joined, "-").into_owned();
        slug.truncate(MAX_SLUG_LEN);

        // The slug alone is ambiguous ("a b" + "c" vs "a" + "b c"), the digest is not.
        let mut hasher = Sha256::new();
        for part in [&topic, &grade, &language] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        let digest: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        Some(CacheKey {
            id: format!("{}-{}", slug, &digest[..DIGEST_HEX_LEN]),
            topic,
            grade,
            language,
        })
    }
}

fn collapse(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}
