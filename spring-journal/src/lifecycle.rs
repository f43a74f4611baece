//! Session lifecycle: who is signed in, where the application should be, and
//! the notifications other views subscribe to.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};

use crate::entry::EntryId;
use crate::profile::ProfileSettings;
use crate::session::{Session, SessionStore, StorageError};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Password,
    OAuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserLogout,
    Unauthorized,
    AccountDeleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Signup,
    Dashboard,
    Journal,
    JournalNew,
    JournalEdit(EntryId),
    Profile,
    OAuthCallback,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Landing => f.write_str("/"),
            Route::Login => f.write_str("/login"),
            Route::Signup => f.write_str("/signup"),
            Route::Dashboard => f.write_str("/dashboard"),
            Route::Journal => f.write_str("/journal"),
            Route::JournalNew => f.write_str("/journal/new"),
            Route::JournalEdit(id) => write!(f, "/journal/edit/{id}"),
            Route::Profile => f.write_str("/profile"),
            Route::OAuthCallback => f.write_str("/auth/google/callback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { username: String, method: AuthMethod },
    SignedOut { reason: LogoutReason },
}

/// Owns every transition between signed-out and signed-in. Logout, a
/// rejected token and account deletion all go through [`end_session`].
///
/// [`end_session`]: SessionLifecycle::end_session
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    state: Mutex<AuthState>,
    profile: Mutex<Option<ProfileSettings>>,
    events: broadcast::Sender<SessionEvent>,
    route: watch::Sender<Route>,
}

impl fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("state", &self.state())
            .field("route", &self.current_route())
            .finish_non_exhaustive()
    }
}

impl SessionLifecycle {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let state = match store.load() {
            Ok(Some(_)) => AuthState::Authenticated,
            Ok(None) => AuthState::Anonymous,
            Err(e) => {
                tracing::warn!("Could not read stored session: {}", e);
                AuthState::Anonymous
            }
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (route, _) = watch::channel(Route::Landing);

        Self {
            store,
            state: Mutex::new(state),
            profile: Mutex::new(None),
            events,
            route,
        }
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn session(&self) -> Result<Option<Session>, StorageError> {
        self.store.load()
    }

    pub fn state(&self) -> AuthState {
        *self.state.lock().expect("lifecycle state lock poisoned")
    }

    fn set_state(&self, state: AuthState) {
        *self.state.lock().expect("lifecycle state lock poisoned") = state;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn watch_route(&self) -> watch::Receiver<Route> {
        self.route.subscribe()
    }

    pub fn current_route(&self) -> Route {
        self.route.borrow().clone()
    }

    pub fn navigate(&self, route: Route) {
        tracing::debug!(%route, "navigate");
        self.route.send_replace(route);
    }

    pub fn redirect_to_login(&self) {
        self.navigate(Route::Login);
    }

    pub fn begin_authentication(&self) {
        self.set_state(AuthState::Authenticating);
    }

    /// Store the session, announce it and move to the dashboard.
    pub fn complete_authentication(
        &self,
        session: Session,
        method: AuthMethod,
    ) -> Result<(), StorageError> {
        if let Err(e) = self.store.save(&session) {
            self.set_state(AuthState::Anonymous);
            return Err(e);
        }

        self.set_state(AuthState::Authenticated);
        tracing::info!(username = %session.username, ?method, "signed in");
        let _ = self.events.send(SessionEvent::SignedIn {
            username: session.username,
            method,
        });
        self.navigate(Route::Dashboard);
        Ok(())
    }

    /// Settle a rejected or abandoned sign-in. The store is left untouched, so
    /// a session that was already stored stays signed in.
    pub fn fail_authentication(&self, message: &str) {
        tracing::info!("sign-in failed: {}", message);
        let state = match self.store.load() {
            Ok(Some(_)) => AuthState::Authenticated,
            Ok(None) => AuthState::Anonymous,
            Err(e) => {
                tracing::warn!("Could not read stored session: {}", e);
                AuthState::Anonymous
            }
        };
        self.set_state(state);
    }

    /// Clear the stored session and cached profile and route to login.
    /// Safe to call any number of times.
    pub fn end_session(&self, reason: LogoutReason) -> Result<(), StorageError> {
        let was_signed_in = self.state() != AuthState::Anonymous;

        self.profile
            .lock()
            .expect("lifecycle profile lock poisoned")
            .take();
        self.set_state(AuthState::Anonymous);
        let cleared = self.store.clear();

        if was_signed_in {
            tracing::info!(?reason, "signed out");
            let _ = self.events.send(SessionEvent::SignedOut { reason });
        }
        self.redirect_to_login();
        cleared
    }

    pub fn cache_profile(&self, profile: ProfileSettings) {
        *self.profile.lock().expect("lifecycle profile lock poisoned") = Some(profile);
    }

    pub fn cached_profile(&self) -> Option<ProfileSettings> {
        self.profile
            .lock()
            .expect("lifecycle profile lock poisoned")
            .clone()
    }

    pub fn update_cached_profile(&self, update: impl FnOnce(&mut ProfileSettings)) {
        if let Some(profile) = self
            .profile
            .lock()
            .expect("lifecycle profile lock poisoned")
            .as_mut()
        {
            update(profile);
        }
    }

    /// Replace the display name kept with the stored session.
    pub fn rename(&self, username: &str) -> Result<(), StorageError> {
        let Some(mut session) = self.store.load()? else {
            return Ok(());
        };
        if session.username == username {
            return Ok(());
        }
        session.username = username.to_string();
        self.store.save(&session)
    }
}
