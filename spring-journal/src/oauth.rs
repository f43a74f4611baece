use std::collections::HashSet;
use std::sync::Mutex;

use serde::Deserialize;
use url::Url;

use crate::error::ApiError;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const OAUTH_SCOPE: &str = "openid email profile";

pub const PROVIDER_ERROR_MESSAGE: &str = "Google authentication was cancelled or failed.";
pub const MISSING_CODE_MESSAGE: &str = "No authorization code received from Google.";
pub const MISSING_TOKEN_MESSAGE: &str = "No token received from backend";
pub const EXCHANGE_FAILED_MESSAGE: &str = "Authentication failed";

#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
}

impl GoogleOAuthConfig {
    pub fn authorization_url(&self) -> Result<Url, ApiError> {
        Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", OAUTH_SCOPE),
                ("response_type", "code"),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| ApiError::invalid_response(format!("bad authorization URL: {e}")))
    }
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" if !value.is_empty() => params.code = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// One-shot latch per authorization code. The first caller to claim a code
/// gets to exchange it; every later claim of the same code is refused.
#[derive(Debug, Default)]
pub struct CallbackLatch {
    claimed: Mutex<HashSet<String>>,
}

impl CallbackLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, code: &str) -> bool {
        self.claimed
            .lock()
            .expect("callback latch lock poisoned")
            .insert(code.to_string())
    }
}

/// Body of a successful GET /auth/google/callback.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthExchangeResponse {
    pub token: Option<String>,
    pub user: Option<OAuthUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthUser {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl OAuthUser {
    pub fn display_name(&self) -> String {
        [&self.username, &self.name, &self.email]
            .into_iter()
            .flatten()
            .find(|candidate| !candidate.is_empty())
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Message for a failed exchange: a JSON `error` or `message` field, else the
/// raw body, else a generic fallback.
pub fn exchange_error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }
    if body.trim().is_empty() {
        EXCHANGE_FAILED_MESSAGE.to_string()
    } else {
        body.to_string()
    }
}
