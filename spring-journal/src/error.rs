use thiserror::Error;

use crate::session::StorageError;
use crate::validation::ValidationError;

pub const SIGN_IN_AGAIN: &str = "Your session has ended. Please sign in again.";
pub const CHECK_CONNECTION: &str = "Network error. Please check your connection and try again.";

/// Every failure a call against the journal backend can produce.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session was stored, so no request was sent.
    #[error("not signed in")]
    Unauthenticated,
    /// The backend answered 401 or 403. The session has already been cleared.
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Application(String),
    #[error("network error: {0}")]
    Network(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// True for the variants that end with the user back on the login screen.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Unauthorized)
    }

    /// Text suitable for showing to the user in the view that made the call.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated | Self::Unauthorized => SIGN_IN_AGAIN.to_string(),
            Self::Network(_) => CHECK_CONNECTION.to_string(),
            Self::Application(message) => message.clone(),
            Self::Validation(err) => err.to_string(),
            Self::InvalidResponse(_) => "Something went wrong. Please try again.".to_string(),
            Self::Storage(err) => format!("Could not access the saved session: {}", err),
            Self::InvalidUrl(url) => format!("The configured API URL is not usable: {}", url),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_get_the_generic_sign_in_message() {
        assert_eq!(ApiError::Unauthorized.user_message(), SIGN_IN_AGAIN);
        assert_eq!(ApiError::Unauthenticated.user_message(), SIGN_IN_AGAIN);
        assert!(ApiError::Unauthorized.requires_sign_in());
    }

    #[test]
    fn network_failures_are_distinct_from_application_errors() {
        let network = ApiError::Network("connection refused".into());
        let app = ApiError::application("Journal not found");

        assert_eq!(network.user_message(), CHECK_CONNECTION);
        assert_eq!(app.user_message(), "Journal not found");
        assert!(!app.requires_sign_in());
    }

    #[test]
    fn validation_errors_surface_their_own_text() {
        let err = ApiError::from(ValidationError::PasswordMismatch);
        assert_eq!(err.user_message(), "Passwords do not match");
    }
}
