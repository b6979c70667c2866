//! PII (Personally Identifiable Information) detection

use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email regex")
});

// Indian mobile numbers: optional +91 prefix, ten digits starting 6-9.
static PHONE_IN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+91[-\s]?)?[6-9][0-9]{9}").expect("phone regex (in)"));

static PHONE_NA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}")
        .expect("phone regex (na)")
});

/// Region whose phone-number format is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhoneRegion {
    #[default]
    India,
    NorthAmerica,
}

impl FromStr for PhoneRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "india" => Ok(Self::India),
            "na" | "us" | "ca" | "north_america" => Ok(Self::NorthAmerica),
            other => Err(format!("unknown phone region: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiKind {
    Email,
    Phone,
}

impl PiiKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// PII detector for free-form request text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiDetector {
    region: PhoneRegion,
}

impl PiiDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: PhoneRegion) -> Self {
        self.region = region;
        self
    }

    pub fn region(&self) -> PhoneRegion {
        self.region
    }

    /// Kinds of PII present in `content`, each listed once.
    ///
    /// Matched text is never returned so the result is safe to log.
    pub fn detect(&self, content: &str) -> Vec<PiiKind> {
        let mut kinds = Vec::new();
        if EMAIL.is_match(content) {
            kinds.push(PiiKind::Email);
        }
        if self.has_phone(content) {
            kinds.push(PiiKind::Phone);
        }
        kinds
    }

    pub fn contains_pii(&self, content: &str) -> bool {
        EMAIL.is_match(content) || self.has_phone(content)
    }

    fn has_phone(&self, content: &str) -> bool {
        match self.region {
            PhoneRegion::India => PHONE_IN.is_match(content),
            // Short matches are usually not phone numbers
            PhoneRegion::NorthAmerica => PHONE_NA
                .find_iter(content)
                .any(|m| m.as_str().chars().filter(char::is_ascii_digit).count() >= 10),
        }
    }
}
