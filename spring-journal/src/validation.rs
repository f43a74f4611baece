//! Checks that run before any request is sent. A failure here never reaches
//! the backend.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const DELETE_CONFIRMATION: &str = "DELETE";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid username regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Username is required")]
    UsernameRequired,
    #[error("Username must be at least 3 characters")]
    UsernameTooShort,
    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameInvalidCharacters,
    #[error("Username already exists. Please choose another.")]
    UsernameTaken,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Please enter a new password to update your profile")]
    NewPasswordRequired,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please enter an email address to enable notifications")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    EmailInvalid,
    #[error("Please provide a title and some content for your entry.")]
    EntryIncomplete,
    #[error("Account deletion cancelled")]
    DeletionNotConfirmed,
}

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::UsernameRequired);
    }
    if password.trim().is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    Ok(())
}

pub fn validate_signup(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::UsernameRequired);
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort);
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::UsernameInvalidCharacters);
    }
    if password.trim().is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_password_change(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::NewPasswordRequired);
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_email_settings(
    email: &str,
    sentiment_analysis: bool,
    journal_summarization: bool,
) -> Result<(), ValidationError> {
    if (sentiment_analysis || journal_summarization) && email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !email.is_empty() && !is_valid_email(email) {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

pub fn validate_entry(title: &str, content: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(ValidationError::EntryIncomplete);
    }
    Ok(())
}

pub fn validate_deletion_confirmation(typed: &str) -> Result<(), ValidationError> {
    if typed != DELETE_CONFIRMATION {
        return Err(ValidationError::DeletionNotConfirmed);
    }
    Ok(())
}
