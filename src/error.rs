use crate::error_code::{status_from_message, FailureClass};
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.topic", "GEN_GUARD_SECRET_NAME")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected value, matched rule)
    pub details: Option<String>,
    /// Source of the error (e.g., "credential_pool", "topic_guard")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A failed upstream invocation, as reported by the caller-supplied operation.
///
/// Only the classification signal matters to the executor; `detail` is carried
/// through untouched for the caller's own diagnostics.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub status: Option<u16>,
    /// Provider status code, e.g. `RESOURCE_EXHAUSTED`.
    pub code: Option<String>,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Best available status: structured field, then provider code, then message text.
    pub fn effective_status(&self) -> Option<u16> {
        self.status
            .or_else(|| {
                self.code
                    .as_deref()
                    .and_then(FailureClass::status_for_provider_code)
            })
            .or_else(|| status_from_message(&self.message))
    }

    pub fn class(&self) -> FailureClass {
        if let Some(status) = self.effective_status() {
            return FailureClass::from_http_status(status);
        }
        self.code
            .as_deref()
            .and_then(FailureClass::from_provider_code)
            .unwrap_or(FailureClass::Unknown)
    }
}

/// An infrastructure fault that was absorbed instead of propagated.
///
/// Cache and rate-limit storage fail open: the request proceeds as a cache miss or
/// an allowed request, and the fault is handed back as a value so callers can log
/// or count it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftFailure {
    pub component: &'static str,
    pub message: String,
}

impl SoftFailure {
    pub fn new(component: &'static str, message: impl Into<String>) -> Self {
        Self {
            component,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} unavailable: {}", self.component, self.message)
    }
}

/// Unified error type for the guard layer.
///
/// Only configuration, upstream and rate-limit errors are meant to reach end users;
/// storage faults surface as [`SoftFailure`] values instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Upstream failed after {attempts} attempt(s) ({class}): {source}")]
    RetryableUpstream {
        attempts: u32,
        class: FailureClass,
        source: UpstreamError,
    },

    #[error("Upstream rejected request ({class}): {source}")]
    PermanentUpstream {
        class: FailureClass,
        source: UpstreamError,
    },

    #[error("Rate limit exceeded. Please wait {wait_minutes} minutes.")]
    RateLimitExceeded { wait_minutes: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// The upstream failure behind this error, if any.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            Error::RetryableUpstream { source, .. } | Error::PermanentUpstream { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimitExceeded { .. })
    }

    /// Message suitable for end users.
    ///
    /// Throttling and generation failures read differently so interfaces can offer
    /// "try again later" and "try again" affordances separately.
    pub fn user_message(&self) -> String {
        match self {
            Error::RateLimitExceeded { wait_minutes } => format!(
                "You have made too many requests. Please wait {} minute{} and try again.",
                wait_minutes,
                if *wait_minutes == 1 { "" } else { "s" }
            ),
            Error::Validation { .. } => {
                "This topic can't be used. Please rephrase your request.".to_string()
            }
            Error::Configuration { .. } => {
                "The generation service is not configured. Please contact support.".to_string()
            }
            _ => "Generation failed. Please try again.".to_string(),
        }
    }
}
