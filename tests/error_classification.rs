//! Tests for upstream failure classification

use gen_guard::error_code::{status_from_message, FailureClass};
use gen_guard::UpstreamError;

#[test]
fn test_rotating_classes() {
    let rotating = vec![
        UpstreamError::new("quota").with_status(429),
        UpstreamError::new("bad key").with_status(401),
        UpstreamError::new("forbidden").with_status(403),
        UpstreamError::new("quota").with_code("RESOURCE_EXHAUSTED"),
        UpstreamError::new("bad key").with_code("UNAUTHENTICATED"),
        UpstreamError::new("forbidden").with_code("PERMISSION_DENIED"),
    ];

    for err in rotating {
        assert!(
            err.class().retryable(),
            "'{}' ({:?}) should rotate credentials",
            err.message,
            err.class()
        );
    }
}

#[test]
fn test_permanent_classes() {
    let permanent = vec![
        (UpstreamError::new("schema mismatch").with_status(400), FailureClass::InvalidRequest),
        (UpstreamError::new("bad arg").with_code("INVALID_ARGUMENT"), FailureClass::InvalidRequest),
        (UpstreamError::new("blocked").with_code("SAFETY"), FailureClass::SafetyBlocked),
        (UpstreamError::new("backend error").with_status(503), FailureClass::ServerError),
        (UpstreamError::new("something odd happened"), FailureClass::Unknown),
    ];

    for (err, expected) in permanent {
        assert_eq!(err.class(), expected, "for '{}'", err.message);
        assert!(!err.class().retryable(), "'{}' must not be retried", err.message);
    }
}

#[test]
fn test_message_only_errors() {
    let fixtures = [
        ("Request failed with status code 401", FailureClass::Unauthenticated),
        ("Error 403: Method doesn't allow unregistered callers", FailureClass::PermissionDenied),
        ("got 403 then 429 on retry", FailureClass::RateLimited),
        ("prompt exceeded 14290 tokens", FailureClass::Unknown),
    ];

    for (message, expected) in fixtures {
        let err = UpstreamError::new(message);
        assert_eq!(err.class(), expected, "for '{}'", message);
        assert_eq!(err.effective_status(), status_from_message(message));
    }
}

#[test]
fn test_structured_status_wins_over_message() {
    let err = UpstreamError::new("upstream said 429").with_status(400);
    assert_eq!(err.class(), FailureClass::InvalidRequest);
}
