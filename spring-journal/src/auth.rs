use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ApiError;
use crate::session::SessionStore;

/// Headers for an authenticated call, built from whatever session is stored
/// right now. Call this immediately before each protected request; a logout
/// between two awaits must not leave a stale token in flight.
///
/// Returns [`ApiError::Unauthenticated`] when nothing usable is stored, in
/// which case the caller must not send the request. A token that cannot be
/// sent as a header is cleared from the store.
pub fn build_auth_headers(store: &dyn SessionStore) -> Result<HeaderMap, ApiError> {
    let Some(session) = store.load()? else {
        return Err(ApiError::Unauthenticated);
    };

    let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", session.token)) else {
        tracing::warn!("Stored token is not a valid header value, clearing it");
        store.clear()?;
        return Err(ApiError::Unauthenticated);
    };

    let mut headers = json_headers();
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

/// Headers for the public endpoints.
pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, Session};

    #[test]
    fn no_session_fails_closed() {
        let store = MemorySessionStore::new();
        assert!(matches!(
            build_auth_headers(&store),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn bearer_and_json_headers_are_set() {
        let store = MemorySessionStore::with_session(Session::new("abc.def.ghi", "ana"));
        let headers = build_auth_headers(&store).unwrap();

        assert_eq!(headers[AUTHORIZATION], "Bearer abc.def.ghi");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn token_with_control_characters_is_rejected_and_cleared() {
        let store = MemorySessionStore::with_session(Session::new("bad\ntoken", "ana"));
        assert!(matches!(
            build_auth_headers(&store),
            Err(ApiError::Unauthenticated)
        ));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn headers_follow_the_store_between_calls() {
        let store = MemorySessionStore::with_session(Session::new("first", "ana"));
        assert_eq!(build_auth_headers(&store).unwrap()[AUTHORIZATION], "Bearer first");

        store.clear().unwrap();
        assert!(build_auth_headers(&store).is_err());
    }
}
