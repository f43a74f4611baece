use serde::{Deserialize, Deserializer, Serialize};

/// The current user as returned by GET /user/me.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment_analysis: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub journal_summarization: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body for PUT /user. Only the fields being edited are sent, so saving one
/// settings tab never overwrites what the other tab owns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_analysis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_summarization: Option<bool>,
}

impl UserUpdate {
    pub fn credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn email_settings(
        email: impl Into<String>,
        sentiment_analysis: bool,
        journal_summarization: bool,
    ) -> Self {
        Self {
            email: Some(email.into()),
            sentiment_analysis: Some(sentiment_analysis),
            journal_summarization: Some(journal_summarization),
            ..Self::default()
        }
    }

    /// Apply the update to a cached copy of the profile.
    pub fn apply_to(&self, profile: &mut ProfileSettings) {
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }
        if let Some(enabled) = self.sentiment_analysis {
            profile.sentiment_analysis = enabled;
        }
        if let Some(enabled) = self.journal_summarization {
            profile.journal_summarization = enabled;
        }
    }
}
