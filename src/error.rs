use thiserror::Error;

#[derive(Debug, Error)]
pub enum MockcatError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("cancelled")]
    Cancelled,

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("upstream error from {provider}: {message}")]
    Upstream {
        provider: String,
        message: String,
        status: Option<u16>,
    },

    #[error("auth failed for {provider}: {message}")]
    AuthFailed { provider: String, message: String },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response is not a JSON array of records: {0}")]
    Parse(String),
}

impl MockcatError {
    /// Extract provider name from structured error variants.
    /// Returns None for variants that don't carry provider context.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::RateLimited { provider } => Some(provider),
            Self::Upstream { provider, .. } => Some(provider),
            Self::AuthFailed { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// True for failures of the backend call itself (network, rate limit,
    /// backend-side error, undecodable envelope).
    pub fn is_model_call(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::RateLimited { .. }
                | Self::Upstream { .. }
                | Self::AuthFailed { .. }
                | Self::SchemaParse(_)
                | Self::Request(_)
        )
    }

    /// Returns true for errors a chunk attempt may recover from on retry.
    /// Model output that failed to parse counts: the next sample may be valid.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthFailed { .. } => false,
            Self::Parse(_) => true,
            e => e.is_model_call(),
        }
    }

    /// Produce a sanitized error message safe for returning to MCP clients.
    /// Does not leak internal URLs, connection details, or upstream error bodies.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(msg) => format!("configuration error: {msg}"),
            Self::Validation(msg) => msg.clone(),
            Self::Timeout(ms) => format!("model request timed out after {ms}ms"),
            Self::Cancelled => "generation cancelled".to_string(),
            Self::RateLimited { provider } => {
                format!("rate limited by {provider}, try again shortly")
            }
            Self::Upstream {
                provider, status, ..
            } => match status {
                Some(code) => format!("upstream error from {provider} (HTTP {code})"),
                None => format!("upstream error from {provider}"),
            },
            Self::AuthFailed { provider, .. } => {
                format!("authentication failed for {provider}, check the API key")
            }
            Self::SchemaParse(_) => "failed to parse provider response".to_string(),
            Self::Request(_) => "request to provider failed".to_string(),
            Self::Parse(_) => "no valid JSON array found in model response".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_transient_errors_are_retryable() {
        assert!(MockcatError::Parse("no array".into()).is_retryable());
        assert!(MockcatError::Timeout(10).is_retryable());
        assert!(
            MockcatError::RateLimited {
                provider: "gemini".into()
            }
            .is_retryable()
        );
        assert!(
            MockcatError::Upstream {
                provider: "gemini".into(),
                message: "boom".into(),
                status: Some(400),
            }
            .is_retryable()
        );
    }

    #[test]
    fn fatal_errors_are_not_retryable() {
        assert!(!MockcatError::Configuration("no key".into()).is_retryable());
        assert!(!MockcatError::Validation("empty".into()).is_retryable());
        assert!(!MockcatError::Cancelled.is_retryable());
        assert!(
            !MockcatError::AuthFailed {
                provider: "gemini".into(),
                message: "401".into(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn parse_error_is_not_a_model_call_error() {
        assert!(!MockcatError::Parse("x".into()).is_model_call());
        assert!(MockcatError::SchemaParse("x".into()).is_model_call());
    }

    #[test]
    fn user_message_hides_upstream_body() {
        let err = MockcatError::Upstream {
            provider: "gemini".into(),
            message: "500: https://internal.example/secret".into(),
            status: Some(500),
        };
        let msg = err.user_message();
        assert!(!msg.contains("internal.example"), "leaked body: {msg}");
        assert!(msg.contains("500"));
    }
}
