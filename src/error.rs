//! Scoring client error types

/// Substring of a remote error code that marks a rejected access token.
const TOKEN_CODE_MARKER: &str = "token";

/// Errors returned by the scoring client.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    // Construction errors
    #[error("{0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Lookup errors
    #[error("resolution error: {0}")]
    Resolution(String),

    // Remote/network errors
    /// The service answered with a non-success status.
    ///
    /// `code` is the machine-readable `code` field of the error body, when
    /// the body carried one.
    #[error("API error ({status}{}): {message}", code_suffix(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// No response was received.
    #[error("HTTP error: {0}")]
    Http(String),

    // Data errors
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScoringError {
    /// Remote error code carried by the failure body, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ScoringError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether the service rejected the bearer token.
    ///
    /// Only remote errors whose code contains `"token"` (case-sensitive)
    /// qualify. Transport failures carry no code and never match.
    pub fn is_token_rejection(&self) -> bool {
        self.code()
            .is_some_and(|code| code.contains(TOKEN_CODE_MARKER))
    }

    pub(crate) fn missing(field: &str) -> Self {
        ScoringError::Configuration(format!("{field} not specified."))
    }
}

impl From<reqwest::Error> for ScoringError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ScoringError::ResponseShape(err.to_string())
        } else {
            ScoringError::Http(err.to_string())
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(", code={c}"))
        .unwrap_or_default()
}

/// Result type alias for scoring operations
pub type Result<T> = std::result::Result<T, ScoringError>;
