//! Topic safety pre-scan.

use crate::{Error, ErrorContext, Result};
use regex::{Regex, RegexBuilder};

pub const POLICY_VIOLATION: &str = "Content Policy Violation";

// Word-start anchored so "skills" or "Essex" stay allowed.
const DEFAULT_UNSAFE_PATTERNS: &[&str] = &[
    r"\bbomb",
    r"\bexplosive",
    r"\bterror",
    r"\bsuicide",
    r"\bkill",
    r"\bporn",
    r"\bsex",
    r"\bnude",
    r"\bgambl",
    r"\bcheat\s+exam",
    r"\bhack",
    r"\bignore\s+previous",
    r"\boverride\s+system",
    r"\byou\s+are\s+not\b",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicVerdict {
    pub safe: bool,
    pub reason: Option<&'static str>,
}

impl TopicVerdict {
    fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }

    fn violation() -> Self {
        Self {
            safe: false,
            reason: Some(POLICY_VIOLATION),
        }
    }
}

/// Case-insensitive screen run on topics before any generation work.
#[derive(Debug, Clone)]
pub struct TopicGuard {
    patterns: Vec<Regex>,
}

impl TopicGuard {
    pub fn new() -> Self {
        Self::with_patterns(DEFAULT_UNSAFE_PATTERNS.iter().copied())
            .expect("default topic patterns are valid")
    }

    /// Builds a guard from custom regex patterns, matched case-insensitively.
    pub fn with_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                RegexBuilder::new(p).case_insensitive(true).build().map_err(|e| {
                    Error::configuration_with_context(
                        format!("invalid topic pattern: {}", e),
                        ErrorContext::new()
                            .with_details(p.to_string())
                            .with_source("topic_guard"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Guard that accepts everything.
    pub fn permissive() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn check(&self, topic: &str) -> TopicVerdict {
        if self.patterns.iter().any(|p| p.is_match(topic)) {
            TopicVerdict::violation()
        } else {
            TopicVerdict::safe()
        }
    }

    pub fn validate(&self, topic: &str) -> Result<()> {
        match self.check(topic).reason {
            None => Ok(()),
            Some(reason) => Err(Error::validation_with_context(
                reason,
                ErrorContext::new()
                    .with_field_path("request.topic")
                    .with_source("topic_guard"),
            )),
        }
    }
}

impl Default for TopicGuard {
    fn default() -> Self {
        Self::new()
    }
}
