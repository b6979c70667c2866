//! 上游错误分类：将 HTTP 状态码、厂商错误码与错误消息映射为统一的失败类别。
//!
//! Upstream failure classification.
//!
//! The executor only needs one bit of information from a failed upstream call:
//! should the next credential be tried or not. This module derives a
//! [`FailureClass`] from whatever signal the upstream client exposes, in order of
//! preference:
//!
//! | Signal | Example | Used when |
//! |--------|---------|-----------|
//! | HTTP status | `429` | the client reports a status field |
//! | Provider status code | `RESOURCE_EXHAUSTED` | gRPC-style clients |
//! | Message substring | `"[429 Too Many Requests]"` | nothing structured is available |
//!
//! ## Example
//!
//! ```rust
//! use gen_guard::error_code::{status_from_message, FailureClass};
//!
//! let class = FailureClass::from_http_status(429);
//! assert!(class.retryable());
//! assert_eq!(class.name(), "rate_limited");
//!
//! assert_eq!(status_from_message("got 401 from upstream"), Some(401));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Statuses that trigger credential rotation, in message-matching priority order.
pub const ROTATING_STATUSES: [u16; 3] = [429, 401, 403];

/// Classified outcome of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// 429: the credential hit its quota or request rate.
    RateLimited,
    /// 401: the credential was rejected.
    Unauthenticated,
    /// 403: the credential lacks permission for the model.
    PermissionDenied,
    /// 400 and friends: malformed input or schema validation failure.
    InvalidRequest,
    /// Output withheld by the provider's safety filters.
    SafetyBlocked,
    /// 5xx from the provider.
    ServerError,
    /// No usable signal.
    Unknown,
}

impl FailureClass {
    /// Standard name used in log fields.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidRequest => "invalid_request",
            Self::SafetyBlocked => "safety_blocked",
            Self::ServerError => "server_error",
            Self::Unknown => "unknown",
        }
    }

    /// Whether another credential may succeed where this one failed.
    ///
    /// Only credential-scoped failures qualify. Bad input, safety rejections and
    /// server faults would fail identically with every key in the pool.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Unauthenticated | Self::PermissionDenied
        )
    }

    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            400 | 404 | 409 | 413 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Maps a provider status code (gRPC-style or error type string).
    pub fn from_provider_code(code: &str) -> Option<Self> {
        let class = match code {
            "RESOURCE_EXHAUSTED" | "rate_limit_exceeded" | "rate_limited" => Self::RateLimited,
            "UNAUTHENTICATED" | "invalid_api_key" | "authentication_error" => {
                Self::Unauthenticated
            }
            "PERMISSION_DENIED" | "permission_error" => Self::PermissionDenied,
            "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "invalid_request_error" => {
                Self::InvalidRequest
            }
            "SAFETY" | "BLOCKED" | "content_filter" => Self::SafetyBlocked,
            "INTERNAL" | "UNAVAILABLE" | "server_error" => Self::ServerError,
            _ => return None,
        };
        Some(class)
    }

    /// Representative HTTP status for a provider code, if it maps to one.
    pub fn status_for_provider_code(code: &str) -> Option<u16> {
        match Self::from_provider_code(code)? {
            Self::RateLimited => Some(429),
            Self::Unauthenticated => Some(401),
            Self::PermissionDenied => Some(403),
            Self::InvalidRequest => Some(400),
            Self::ServerError => Some(500),
            Self::SafetyBlocked | Self::Unknown => None,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static STATUS_IN_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(429|401|403)\b").expect("status regex"));

/// Last-resort status extraction from an error message.
///
/// Some clients fold the HTTP status into the message text only. A code counts when
/// it stands alone as a word (not part of a longer number or identifier). When
/// several appear, `429` wins over `401`, which wins over `403`.
pub fn status_from_message(message: &str) -> Option<u16> {
    let found: Vec<u16> = STATUS_IN_MESSAGE
        .find_iter(message)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    ROTATING_STATUSES
        .iter()
        .copied()
        .find(|status| found.contains(status))
}
