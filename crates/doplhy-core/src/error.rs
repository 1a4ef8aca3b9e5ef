//! Errors surfaced by the remote generation call.

use reqwest::StatusCode;
use thiserror::Error;

/// Substring the Gemini API puts in its message when the key is rejected.
pub const INVALID_KEY_MARKER: &str = "API key not valid";

#[derive(Debug, Error)]
pub enum AiError {
    /// No credential was available for the request.
    #[error("API key is missing")]
    MissingCredential,

    /// The request never produced an HTTP response (DNS, TLS, connection reset, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Gemini API error {status}: {message}")]
    Api { status: StatusCode, message: String },

    /// The API answered successfully but without any text.
    #[error("Gemini API returned no text")]
    EmptyReply,

    /// The task running the request panicked or was cancelled.
    #[error("request task failed: {0}")]
    TaskFailed(String),
}

impl AiError {
    /// Whether the remote side rejected the credential.
    ///
    /// This is a plain substring match on the rendered message, which is the
    /// only signal the API gives us. It breaks if the upstream wording changes.
    pub fn is_invalid_credential(&self) -> bool {
        self.to_string().contains(INVALID_KEY_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_detected_from_api_message() {
        let err = AiError::Api {
            status: StatusCode::BAD_REQUEST,
            message: "API key not valid. Please pass a valid API key.".to_string(),
        };
        assert!(err.is_invalid_credential());
    }

    #[test]
    fn test_other_api_errors_are_generic() {
        let err = AiError::Api {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "Resource has been exhausted".to_string(),
        };
        assert!(!err.is_invalid_credential());
        assert!(!AiError::EmptyReply.is_invalid_credential());
        assert!(!AiError::MissingCredential.is_invalid_credential());
    }
}
