use std::path::{Path, PathBuf};
use std::sync::Mutex;
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

use thiserror::Error;

pub const TOKEN_KEY: &str = "auth_token";
pub const USERNAME_KEY: &str = "username";

/// The client's record of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
}

impl Session {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Single source of truth for whether a user is signed in.
///
/// There is no expiry tracking: a stored session is only known to be invalid
/// once the backend rejects its token.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, StorageError>;
    fn save(&self, session: &Session) -> Result<(), StorageError>;
    /// Removing an absent session is not an error.
    fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self
            .session
            .lock()
            .expect("session store lock poisoned")
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self.session.lock().expect("session store lock poisoned") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.session.lock().expect("session store lock poisoned") = None;
        Ok(())
    }
}

/// Persists the session as two owner-only files, `auth_token` and `username`,
/// inside a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn token_path(&self) -> PathBuf {
        self.root.join(TOKEN_KEY)
    }

    pub fn username_path(&self) -> PathBuf {
        self.root.join(USERNAME_KEY)
    }
}

fn io_error(action: &'static str, path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

fn read_trimmed(path: &Path) -> Result<Option<String>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;
    let value = raw.trim().to_string();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(value))
}

fn secure_write(path: &Path, content: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut file| file.write_all(content.as_bytes()))
            .map_err(|e| io_error("write", path, e))?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content).map_err(|e| io_error("write", path, e))?;
    }

    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error("remove", path, e)),
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        let Some(token) = read_trimmed(&self.token_path())? else {
            return Ok(None);
        };
        let username = read_trimmed(&self.username_path())?.unwrap_or_default();
        Ok(Some(Session { token, username }))
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        secure_write(&self.username_path(), &session.username)?;
        secure_write(&self.token_path(), &session.token)
    }

    fn clear(&self) -> Result<(), StorageError> {
        // Token first: a leftover username alone never counts as a session.
        remove_if_exists(&self.token_path())?;
        remove_if_exists(&self.username_path())
    }
}
