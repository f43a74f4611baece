use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use url::Url;

use crate::auth::{build_auth_headers, json_headers};
use crate::dashboard::Dashboard;
use crate::entry::{normalize, EntryDraft, EntryId, EntryPayload, JournalEntry};
use crate::error::{ApiError, Result};
use crate::lifecycle::{AuthMethod, AuthState, LogoutReason, Route, SessionLifecycle};
use crate::oauth::{
    exchange_error_message, CallbackLatch, CallbackParams, OAuthExchangeResponse,
    EXCHANGE_FAILED_MESSAGE, MISSING_CODE_MESSAGE, MISSING_TOKEN_MESSAGE, PROVIDER_ERROR_MESSAGE,
};
use crate::profile::{ProfileSettings, UserUpdate};
use crate::response::{classify, classify_response, Classification, RawResponse, ResponseBody};
use crate::session::Session;
use crate::validation::{self, ValidationError};

pub const DEFAULT_API_URL: &str = "https://springjournal.onrender.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const LOGIN_ACCOUNT_NOT_FOUND: &str =
    "Account not found. Please sign up first or check your username.";
const LOGIN_INVALID_CREDENTIALS: &str = "Invalid username or password. Please try again.";
const LOGIN_ACCESS_DENIED: &str = "Access denied. Please check your credentials.";
const LOGIN_FAILED: &str = "Login failed. Please try again later.";
const SIGNUP_FAILED: &str = "Failed to create account. Please try again.";
const SIGNUP_INVALID_INPUT: &str = "Invalid input. Please check your details.";

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthOutcome {
    SignedIn(Session),
    /// The code was already exchanged by an earlier callback.
    AlreadyHandled,
}

/// Typed access to the journal backend. Every protected call builds its
/// bearer headers from the session store right before sending, and every
/// response goes through [`classify`].
pub struct JournalClient {
    client: Client,
    base_url: Url,
    lifecycle: Arc<SessionLifecycle>,
    oauth_latch: CallbackLatch,
}

impl JournalClient {
    pub fn new(base_url: &str, lifecycle: Arc<SessionLifecycle>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            lifecycle,
            oauth_latch: CallbackLatch::new(),
        })
    }

    pub fn lifecycle(&self) -> &Arc<SessionLifecycle> {
        &self.lifecycle
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn entry_endpoint(&self, id: &EntryId) -> Result<Url> {
        let mut url = self.endpoint("/journal/id")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .push(id.as_str());
        Ok(url)
    }

    async fn send_public(&self, request: RequestBuilder, call_name: &str) -> Result<RawResponse> {
        tracing::debug!("{}", call_name);
        let response = request.headers(json_headers()).send().await.map_err(|e| {
            tracing::warn!("{} failed: {}", call_name, e);
            ApiError::from(e)
        })?;
        RawResponse::read(response).await
    }

    async fn send_authorized(
        &self,
        request: RequestBuilder,
        call_name: &str,
        default_message: &str,
    ) -> Result<ResponseBody> {
        let headers = match build_auth_headers(self.lifecycle.store()) {
            Ok(headers) => headers,
            Err(ApiError::Unauthenticated) => {
                tracing::debug!("{} skipped: no session", call_name);
                // The store lost its session while the user was signed in.
                if self.lifecycle.state() == AuthState::Authenticated {
                    if let Err(e) = self.lifecycle.end_session(LogoutReason::Unauthorized) {
                        tracing::warn!("Could not clear session: {}", e);
                    }
                } else {
                    self.lifecycle.redirect_to_login();
                }
                return Err(ApiError::Unauthenticated);
            }
            Err(e) => return Err(e),
        };

        tracing::debug!("{}", call_name);
        let response = request.headers(headers).send().await.map_err(|e| {
            tracing::warn!("{} failed: {}", call_name, e);
            ApiError::from(e)
        })?;

        match classify_response(response, default_message).await? {
            Classification::Success(body) => Ok(body),
            Classification::ApplicationError(message) => Err(ApiError::Application(message)),
            Classification::Unauthorized => {
                tracing::info!("{} rejected the session", call_name);
                if let Err(e) = self.lifecycle.end_session(LogoutReason::Unauthorized) {
                    tracing::warn!("Could not clear session: {}", e);
                }
                Err(ApiError::Unauthorized)
            }
        }
    }

    /// POST /public/login. On success the session is stored and the
    /// application moves to the dashboard.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        validation::validate_login(username, password)?;

        self.lifecycle.begin_authentication();
        let result = self.request_login(username, password).await;

        match result {
            Ok(token) => {
                let session = Session::new(token, username);
                self.lifecycle
                    .complete_authentication(session.clone(), AuthMethod::Password)?;
                Ok(session)
            }
            Err(e) => {
                self.lifecycle.fail_authentication(&e.to_string());
                Err(e)
            }
        }
    }

    async fn request_login(&self, username: &str, password: &str) -> Result<String> {
        let raw = self
            .send_public(
                self.client
                    .post(self.endpoint("/public/login")?)
                    .json(&CredentialsRequest { username, password }),
                "POST /public/login",
            )
            .await?;
        let status = raw.status;
        let body = raw.body.clone();

        match classify(raw, LOGIN_FAILED)? {
            Classification::Success(body) => {
                let token = body.into_text().trim().to_string();
                if token.is_empty() {
                    return Err(ApiError::invalid_response("login returned an empty token"));
                }
                Ok(token)
            }
            Classification::Unauthorized if status == 403 => {
                Err(ApiError::application(LOGIN_ACCESS_DENIED))
            }
            Classification::Unauthorized => Err(ApiError::application(login_rejection(&body))),
            Classification::ApplicationError(_) if status == 400 => {
                Err(ApiError::application(login_rejection(&body)))
            }
            Classification::ApplicationError(_) => Err(ApiError::application(LOGIN_FAILED)),
        }
    }

    /// POST /public/signup. Success routes to the login screen.
    pub async fn signup(&self, username: &str, password: &str) -> Result<()> {
        validation::validate_signup(username, password)?;

        let raw = self
            .send_public(
                self.client
                    .post(self.endpoint("/public/signup")?)
                    .json(&CredentialsRequest { username, password }),
                "POST /public/signup",
            )
            .await?;
        let status = raw.status;

        match classify(raw, SIGNUP_FAILED)? {
            Classification::Success(body) => match body.json::<bool>() {
                Ok(true) => {
                    self.lifecycle.navigate(Route::Login);
                    Ok(())
                }
                Ok(false) => Err(ApiError::application(SIGNUP_FAILED)),
                Err(e) => Err(e),
            },
            Classification::ApplicationError(_) if status == 409 => {
                Err(ValidationError::UsernameTaken.into())
            }
            Classification::ApplicationError(body) if status == 400 => {
                if body.to_lowercase().contains("exist") {
                    Err(ValidationError::UsernameTaken.into())
                } else {
                    Err(ApiError::application(SIGNUP_INVALID_INPUT))
                }
            }
            Classification::ApplicationError(_) | Classification::Unauthorized => {
                Err(ApiError::application(SIGNUP_FAILED))
            }
        }
    }

    /// Handle the identity provider's redirect. A given code is exchanged at
    /// most once per client, however many times the callback is delivered.
    pub async fn handle_oauth_callback(&self, params: &CallbackParams) -> Result<OAuthOutcome> {
        if let Some(error) = &params.error {
            tracing::warn!("OAuth provider returned an error: {}", error);
            return Err(self.abandon_oauth(PROVIDER_ERROR_MESSAGE));
        }
        let Some(code) = params.code.as_deref() else {
            return Err(self.abandon_oauth(MISSING_CODE_MESSAGE));
        };
        if !self.oauth_latch.claim(code) {
            tracing::debug!("authorization code already exchanged");
            return Ok(OAuthOutcome::AlreadyHandled);
        }

        self.lifecycle.begin_authentication();
        match self.exchange_code(code).await {
            Ok(session) => {
                self.lifecycle
                    .complete_authentication(session.clone(), AuthMethod::OAuth)?;
                Ok(OAuthOutcome::SignedIn(session))
            }
            Err(e) => {
                self.lifecycle.fail_authentication(&e.to_string());
                self.lifecycle.redirect_to_login();
                Err(e)
            }
        }
    }

    fn abandon_oauth(&self, message: &str) -> ApiError {
        self.lifecycle.fail_authentication(message);
        self.lifecycle.redirect_to_login();
        ApiError::application(message)
    }

    async fn exchange_code(&self, code: &str) -> Result<Session> {
        let mut url = self.endpoint("/auth/google/callback")?;
        url.query_pairs_mut().append_pair("code", code);

        let raw = self
            .send_public(self.client.get(url), "GET /auth/google/callback")
            .await?;

        match classify(raw, "")? {
            Classification::Success(body) => {
                let response: OAuthExchangeResponse = body.json()?;
                let token = response
                    .token
                    .filter(|token| !token.trim().is_empty())
                    .ok_or_else(|| ApiError::application(MISSING_TOKEN_MESSAGE))?;
                let username = response
                    .user
                    .map(|user| user.display_name())
                    .unwrap_or_default();
                Ok(Session::new(token, username))
            }
            Classification::ApplicationError(body) => {
                Err(ApiError::application(exchange_error_message(&body)))
            }
            Classification::Unauthorized => Err(ApiError::application(EXCHANGE_FAILED_MESSAGE)),
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.lifecycle.end_session(LogoutReason::UserLogout)?;
        Ok(())
    }

    /// GET /user/me. Refreshes the stored display name and the cached profile.
    pub async fn me(&self) -> Result<ProfileSettings> {
        let profile: ProfileSettings = self
            .send_authorized(
                self.client.get(self.endpoint("/user/me")?),
                "GET /user/me",
                "Failed to load user data",
            )
            .await?
            .json()?;

        if !profile.username.is_empty() {
            self.lifecycle.rename(&profile.username)?;
        }
        self.lifecycle.cache_profile(profile.clone());
        Ok(profile)
    }

    /// PUT /user with whichever fields `update` carries.
    pub async fn update_user(&self, update: &UserUpdate) -> Result<()> {
        self.send_authorized(
            self.client.put(self.endpoint("/user")?).json(update),
            "PUT /user",
            "Failed to update profile",
        )
        .await?;

        self.lifecycle
            .update_cached_profile(|profile| update.apply_to(profile));
        if let Some(username) = &update.username {
            self.lifecycle.rename(username)?;
        }
        Ok(())
    }

    pub async fn update_credentials(
        &self,
        username: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<()> {
        validation::validate_password_change(password, confirmation)?;
        self.update_user(&UserUpdate::credentials(username, password))
            .await
    }

    pub async fn update_email_settings(
        &self,
        email: &str,
        sentiment_analysis: bool,
        journal_summarization: bool,
    ) -> Result<()> {
        validation::validate_email_settings(email, sentiment_analysis, journal_summarization)?;
        self.update_user(&UserUpdate::email_settings(
            email,
            sentiment_analysis,
            journal_summarization,
        ))
        .await
    }

    /// DELETE /user, then end the session. `confirmation` must be the literal
    /// `DELETE`.
    pub async fn delete_account(&self, confirmation: &str) -> Result<()> {
        validation::validate_deletion_confirmation(confirmation)?;

        self.send_authorized(
            self.client.delete(self.endpoint("/user")?),
            "DELETE /user",
            "Failed to delete account",
        )
        .await?;

        self.lifecycle.end_session(LogoutReason::AccountDeleted)?;
        Ok(())
    }

    pub async fn greeting(&self) -> Result<String> {
        Ok(self
            .send_authorized(
                self.client.get(self.endpoint("/user/greetings")?),
                "GET /user/greetings",
                "Failed to fetch greetings",
            )
            .await?
            .into_text())
    }

    /// GET /journal, normalized to a list whatever shape the backend sends.
    pub async fn list_entries(&self) -> Result<Vec<JournalEntry>> {
        let body = self
            .send_authorized(
                self.client.get(self.endpoint("/journal")?),
                "GET /journal",
                "Failed to fetch journal entries",
            )
            .await?;

        let payload = EntryPayload::try_from(body)?;
        Ok(normalize(payload, OffsetDateTime::now_utc()))
    }

    pub async fn get_entry(&self, id: &EntryId) -> Result<JournalEntry> {
        self.send_authorized(
            self.client.get(self.entry_endpoint(id)?),
            "GET /journal/id/:id",
            "Failed to load journal entry",
        )
        .await?
        .json()
    }

    /// POST /journal. Returns the stored entry when the backend echoes it.
    pub async fn create_entry(&self, draft: &EntryDraft) -> Result<Option<JournalEntry>> {
        validation::validate_entry(&draft.title, &draft.content)?;

        let body = self
            .send_authorized(
                self.client.post(self.endpoint("/journal")?).json(draft),
                "POST /journal",
                "Failed to save journal entry",
            )
            .await?;

        match body {
            ResponseBody::Json(value @ Value::Object(_)) => Ok(Some(serde_json::from_value(value)?)),
            _ => Ok(None),
        }
    }

    pub async fn update_entry(&self, id: &EntryId, draft: &EntryDraft) -> Result<()> {
        validation::validate_entry(&draft.title, &draft.content)?;

        self.send_authorized(
            self.client.put(self.entry_endpoint(id)?).json(draft),
            "PUT /journal/id/:id",
            "Failed to update journal entry",
        )
        .await?;
        Ok(())
    }

    pub async fn delete_entry(&self, id: &EntryId) -> Result<()> {
        self.send_authorized(
            self.client.delete(self.entry_endpoint(id)?),
            "DELETE /journal/id/:id",
            "Failed to delete the journal entry",
        )
        .await?;
        Ok(())
    }

    /// Greeting and entries in one go. A failed greeting only costs the
    /// greeting; a rejected session fails the whole refresh.
    pub async fn dashboard(&self) -> Result<Dashboard> {
        let greeting = match self.greeting().await {
            Ok(text) => Some(text),
            Err(e) if e.requires_sign_in() => return Err(e),
            Err(e) => {
                tracing::warn!("Could not load greeting: {}", e);
                None
            }
        };

        let entries = self.list_entries().await?;
        Ok(Dashboard::new(greeting, entries))
    }
}

fn login_rejection(body: &str) -> &'static str {
    let body = body.to_lowercase();
    if ["incorrect username", "user not found", "bad credentials"]
        .iter()
        .any(|needle| body.contains(needle))
    {
        LOGIN_ACCOUNT_NOT_FOUND
    } else {
        LOGIN_INVALID_CREDENTIALS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    fn client(base_url: &str) -> JournalClient {
        let lifecycle = Arc::new(SessionLifecycle::new(Arc::new(MemorySessionStore::new())));
        JournalClient::new(base_url, lifecycle, DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn endpoints_keep_a_base_path_prefix() {
        let client = client("https://example.com/api/");
        assert_eq!(
            client.endpoint("/journal").unwrap().as_str(),
            "https://example.com/api/journal"
        );
        assert_eq!(
            client.entry_endpoint(&EntryId::new("a b/c")).unwrap().as_str(),
            "https://example.com/api/journal/id/a%20b%2Fc"
        );
    }

    #[test]
    fn endpoints_on_a_bare_origin() {
        let client = client("https://springjournal.onrender.com");
        assert_eq!(
            client.endpoint("/public/login").unwrap().as_str(),
            "https://springjournal.onrender.com/public/login"
        );
    }

    #[test]
    fn unusable_base_urls_are_rejected() {
        let lifecycle = Arc::new(SessionLifecycle::new(Arc::new(MemorySessionStore::new())));
        assert!(matches!(
            JournalClient::new("not a url", lifecycle.clone(), DEFAULT_TIMEOUT),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            JournalClient::new("mailto:ana@example.com", lifecycle, DEFAULT_TIMEOUT),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn login_rejection_messages() {
        assert_eq!(login_rejection("Bad credentials"), LOGIN_ACCOUNT_NOT_FOUND);
        assert_eq!(login_rejection("User not found: ana"), LOGIN_ACCOUNT_NOT_FOUND);
        assert_eq!(login_rejection("nope"), LOGIN_INVALID_CREDENTIALS);
    }
}
