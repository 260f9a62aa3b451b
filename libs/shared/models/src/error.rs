use thiserror::Error;

/// Failure of a call against the portal API.
///
/// Empty results are not errors; callers get an empty collection back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Map a non-2xx status and the server's `error` message (if any).
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));

        match status {
            401 | 403 => ApiError::Unauthorized(message),
            _ => ApiError::Server { status, message },
        }
    }

    pub fn missing_session() -> Self {
        ApiError::Unauthorized("No active session".to_string())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Status code reported by the server, if the failure got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_auth_statuses_map_to_unauthorized() {
        assert_matches!(ApiError::from_status(401, None), ApiError::Unauthorized(_));
        assert_matches!(
            ApiError::from_status(403, Some("Forbidden".into())),
            ApiError::Unauthorized(msg) if msg == "Forbidden"
        );
    }

    #[test]
    fn test_missing_message_falls_back_to_status() {
        let err = ApiError::from_status(500, Some("  ".into()));
        assert_eq!(err, ApiError::Server { status: 500, message: "HTTP 500".into() });
        assert_eq!(err.status(), Some(500));
    }
}
