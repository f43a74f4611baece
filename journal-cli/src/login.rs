use std::time::Duration;

use anyhow::{bail, Context, Result};
use spring_journal::lifecycle::Route;
use spring_journal::oauth::{CallbackParams, GoogleOAuthConfig};
use spring_journal::session::Session;
use spring_journal::{JournalClient, OAuthOutcome};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use crate::config::JournalConfig;

const CALLBACK_WAIT: Duration = Duration::from_secs(300);

/// Run the Google sign-in flow:
/// 1. Listen on the configured redirect URI's port
/// 2. Open the Google authorization URL in the system browser
/// 3. Wait for the browser to come back with ?code=<value>
/// 4. Exchange the code with the backend and save the session
pub async fn run_google_login(client: &JournalClient, config: &JournalConfig) -> Result<Session> {
    let client_id = config
        .google_client_id
        .clone()
        .context("google_client_id is not set. Add it to config.toml (see `journal config-path`).")?;
    let redirect = Url::parse(&config.oauth_redirect_uri)
        .with_context(|| format!("Invalid oauth_redirect_uri: {}", config.oauth_redirect_uri))?;
    let port = redirect
        .port_or_known_default()
        .context("oauth_redirect_uri has no port")?;

    let oauth = GoogleOAuthConfig {
        client_id,
        redirect_uri: config.oauth_redirect_uri.clone(),
    };
    let auth_url = oauth.authorization_url()?;

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("Failed to bind to port {}", port))?;

    println!("Opening browser for Google sign-in...");
    println!("If the browser doesn't open, visit:\n  {}\n", auth_url);
    open_browser(auth_url.as_str());

    let callback = tokio::time::timeout(CALLBACK_WAIT, wait_for_callback(&listener, redirect.path()))
        .await
        .context("Timed out waiting for the browser to return")??;

    client.lifecycle().navigate(Route::OAuthCallback);
    let params = CallbackParams::from_url(&callback);
    match client.handle_oauth_callback(&params).await? {
        OAuthOutcome::SignedIn(session) => Ok(session),
        OAuthOutcome::AlreadyHandled => bail!("This sign-in link was already used. Try again."),
    }
}

/// Open a URL in the system default browser.
fn open_browser(url: &str) {
    #[cfg(target_os = "linux")]
    let _ = std::process::Command::new("xdg-open").arg(url).spawn();
    #[cfg(target_os = "macos")]
    let _ = std::process::Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let _ = std::process::Command::new("cmd")
        .args(["/c", "start", "", url])
        .spawn();
}

/// Accept connections until one hits `expected_path`, answer it, and return
/// the full callback URL. Other requests (favicon etc.) get a 404.
async fn wait_for_callback(listener: &TcpListener, expected_path: &str) -> Result<Url> {
    println!("Waiting for browser callback...");

    loop {
        let (mut stream, _) = listener.accept().await.context("Failed to accept connection")?;

        let mut buf = vec![0u8; 8192];
        let n = stream
            .read(&mut buf)
            .await
            .context("Failed to read from socket")?;
        let request = String::from_utf8_lossy(&buf[..n]);

        let Some(callback) = parse_request_target(&request) else {
            stream.write_all(NOT_FOUND.as_bytes()).await.ok();
            continue;
        };
        if callback.path() != expected_path {
            stream.write_all(NOT_FOUND.as_bytes()).await.ok();
            continue;
        }

        stream
            .write_all(SIGNED_IN_PAGE.as_bytes())
            .await
            .context("Failed to write response")?;
        return Ok(callback);
    }
}

const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const SIGNED_IN_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h2>Signing you in...</h2><p>You can close this tab and return to the terminal.</p></body></html>";

/// "GET /auth/google/callback?code=abc HTTP/1.1" -> http://localhost/auth/google/callback?code=abc
fn parse_request_target(request: &str) -> Option<Url> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    if !target.starts_with('/') {
        return None;
    }
    Url::parse(&format!("http://localhost{}", target)).ok()
}
