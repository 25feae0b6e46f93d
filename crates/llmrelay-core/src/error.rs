use http::StatusCode;
use llmrelay_protocol::ApiErrorBody;
use llmrelay_transform::canonical::UpstreamError;
use llmrelay_transform::middleware::ProcessError;
use thiserror::Error;

pub const INVALID_REQUEST_ERROR: &str = "invalid_request_error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Inbound body is malformed or misses a required field. `code` is the
    /// machine-matchable reason (`missing_messages`, `invalid_json`, ...).
    #[error("{message}")]
    Validation { code: &'static str, message: String },
    #[error("provider configuration error: {0}")]
    ProviderConfig(String),
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("downstream closed: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
}

impl RelayError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::ProviderConfig(_) => "provider_config",
            Self::ModelNotFound(_) => "model_not_found",
            Self::Upstream(_) => "upstream",
            Self::Transport(_) => "transport",
            Self::Timeout => "timeout",
        }
    }

    /// Status and body for a pre-stream failure. Validation errors carry
    /// their own code; everything else is classified from the message text.
    pub fn to_api_error(&self) -> (StatusCode, ApiErrorBody) {
        let message = self.to_string();
        match self {
            Self::Validation { code, .. } => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new(message, INVALID_REQUEST_ERROR, *code),
            ),
            Self::ModelNotFound(_) => classify_message(&message, ErrorCategory::ModelNotFound),
            Self::ProviderConfig(_) => classify_message(&message, ErrorCategory::Authentication),
            _ => classify_message(&message, ErrorCategory::Internal),
        }
    }
}

impl From<UpstreamError> for RelayError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err.message)
    }
}

impl From<ProcessError> for RelayError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Upstream(err) => err.into(),
            ProcessError::SinkClosed(err) => Self::Transport(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    ModelNotFound,
    Authentication,
    RateLimit,
    Unavailable,
    Internal,
}

impl ErrorCategory {
    fn status(self) -> StatusCode {
        match self {
            Self::ModelNotFound => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(self) -> &'static str {
        match self {
            Self::ModelNotFound => "model_not_found",
            Self::Authentication => "authentication_error",
            Self::RateLimit => "rate_limit_exceeded",
            Self::Unavailable => "upstream_unavailable",
            Self::Internal => "internal_error",
        }
    }
}

const MODEL_NOT_FOUND_PATTERNS: &[&str] = &["model not found", "model_not_found", "unknown model"];
const AUTH_PATTERNS: &[&str] = &[
    "api key",
    "api_key",
    "unauthorized",
    "authentication",
    "invalid token",
    "credential",
    "401",
];
const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "rate_limit", "too many requests", "429"];
const UNAVAILABLE_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "econnrefused",
    "econnreset",
    "unavailable",
];

/// Heuristic mapping from a free-form provider message to a category.
/// Falls back to `default` when nothing matches.
fn classify_message(message: &str, default: ErrorCategory) -> (StatusCode, ApiErrorBody) {
    let lower = message.to_ascii_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|pattern| lower.contains(pattern));
    let category = if default == ErrorCategory::ModelNotFound || matches(MODEL_NOT_FOUND_PATTERNS)
    {
        ErrorCategory::ModelNotFound
    } else if matches(AUTH_PATTERNS) {
        ErrorCategory::Authentication
    } else if matches(RATE_LIMIT_PATTERNS) {
        ErrorCategory::RateLimit
    } else if matches(UNAVAILABLE_PATTERNS) {
        ErrorCategory::Unavailable
    } else {
        default
    };
    (
        category.status(),
        ApiErrorBody::new(message, category.code(), category.code()),
    )
}
