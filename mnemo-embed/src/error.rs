//! Error types for embedding operations.

use reqwest::StatusCode;

/// Result type for embedding operations
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Coarse classification of a provider failure, used by callers that only
/// need to decide how to surface the error (bad credentials vs. transient
/// rate limiting vs. content rejection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Invalid or missing API credentials
    Auth,
    /// Quota exhausted or rate limited
    Quota,
    /// Content rejected by the provider's safety filters
    Safety,
    /// Anything else
    Unknown,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::Auth => "auth",
            ProviderErrorKind::Quota => "quota",
            ProviderErrorKind::Safety => "safety",
            ProviderErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while generating embeddings
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The provider rejected our credentials
    #[error("embedding provider rejected credentials: {0}")]
    Auth(String),

    /// Quota exhausted or the provider is rate limiting us
    #[error("embedding provider quota exhausted or rate limited: {0}")]
    Quota(String),

    /// The provider's safety filters blocked the content
    #[error("embedding provider blocked content: {0}")]
    Safety(String),

    /// Unclassified provider or transport failure
    #[error("embedding request failed: {0}")]
    Unknown(String),
}

impl EmbedError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            EmbedError::Auth(_) => ProviderErrorKind::Auth,
            EmbedError::Quota(_) => ProviderErrorKind::Quota,
            EmbedError::Safety(_) => ProviderErrorKind::Safety,
            EmbedError::Unknown(_) => ProviderErrorKind::Unknown,
        }
    }

    /// Classify a non-success HTTP response from the provider.
    ///
    /// Status codes are checked first; when the status is ambiguous the
    /// response body is scanned for the provider's well-known error phrases.
    pub(crate) fn classify_response(status: StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", truncate(body, 300))
        };
        match status.as_u16() {
            401 | 403 => return EmbedError::Auth(message),
            429 => return EmbedError::Quota(message),
            _ => {}
        }
        let lower = body.to_lowercase();
        if lower.contains("api key") || lower.contains("unauthenticated") {
            EmbedError::Auth(message)
        } else if lower.contains("quota")
            || lower.contains("rate limit")
            || lower.contains("resource_exhausted")
        {
            EmbedError::Quota(message)
        } else if lower.contains("safety") || lower.contains("blocked") {
            EmbedError::Safety(message)
        } else {
            EmbedError::Unknown(message)
        }
    }

    /// Classify a transport-level failure. Timeouts are treated as rate
    /// limiting since an overloaded provider and an exhausted quota look
    /// the same from this side of the connection.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EmbedError::Quota(format!("request timed out: {err}"))
        } else {
            EmbedError::Unknown(err.to_string())
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = EmbedError::classify_response(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.kind(), ProviderErrorKind::Auth);

        let err = EmbedError::classify_response(StatusCode::FORBIDDEN, "nope");
        assert_eq!(err.kind(), ProviderErrorKind::Auth);

        let err = EmbedError::classify_response(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.kind(), ProviderErrorKind::Quota);
    }

    #[test]
    fn test_body_classification() {
        let err = EmbedError::classify_response(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "API key not valid"}}"#,
        );
        assert_eq!(err.kind(), ProviderErrorKind::Auth);

        let err = EmbedError::classify_response(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#,
        );
        assert_eq!(err.kind(), ProviderErrorKind::Quota);

        let err = EmbedError::classify_response(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "Request blocked for SAFETY reasons"}}"#,
        );
        assert_eq!(err.kind(), ProviderErrorKind::Safety);

        let err = EmbedError::classify_response(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert_eq!(err.kind(), ProviderErrorKind::Unknown);
    }

    #[test]
    fn test_message_includes_status() {
        let err = EmbedError::classify_response(StatusCode::INTERNAL_SERVER_ERROR, "backend down");
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("backend down"));
    }
}
