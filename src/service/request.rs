use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ANONYMOUS_USER: &str = "anonymous_user";

static GRADE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("grade regex"));

const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("hi", "Hindi"),
    ("kn", "Kannada"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("mr", "Marathi"),
    ("bn", "Bengali"),
];

/// One generation request as it reaches the guard layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    pub topic: String,
    pub grade: String,
    pub language: String,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, grade: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            user_id: None,
            topic: topic.into(),
            grade: grade.into(),
            language: language.into(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Rate-limit identity; requests without a user id share [`ANONYMOUS_USER`].
    pub fn identity(&self) -> &str {
        match self.user_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => ANONYMOUS_USER,
        }
    }

    /// No user id, or a blank one. A user literally named [`ANONYMOUS_USER`] is not anonymous.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.as_deref().map_or(true, |id| id.trim().is_empty())
    }

    /// Request with language codes expanded and grades written as `Class N`.
    ///
    /// The topic is left untouched: PII screening must see it raw.
    pub fn canonicalized(&self) -> Self {
        Self {
            user_id: self
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            topic: self.topic.clone(),
            grade: canonical_grade(&self.grade),
            language: canonical_language(&self.language),
        }
    }
}

fn canonical_language(language: &str) -> String {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        return "English".to_string();
    }
    LANGUAGES
        .iter()
        .find(|(code, _)| trimmed.eq_ignore_ascii_case(code))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn canonical_grade(grade: &str) -> String {
    let trimmed = grade.trim();
    let lower = trimmed.to_lowercase();
    if lower.contains("nursery") {
        return "Nursery".to_string();
    }
    if lower.contains("lkg") {
        return "LKG".to_string();
    }
    if lower.contains("ukg") {
        return "UKG".to_string();
    }
    match GRADE_NUMBER
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<u32>().ok())
    {
        Some(number) => format!("Class {}", number),
        None => trimmed.to_string(),
    }
}
