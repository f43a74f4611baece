use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};

use crate::error::ApiError;
use crate::lifecycle::SessionEvent;
use crate::response::ResponseBody;

/// Title given to entries synthesized from a plain-text response.
pub const TEXT_RESPONSE_TITLE: &str = "Response";
pub const PREVIEW_LENGTH: usize = 120;
pub const MAX_STREAK_DAYS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Ids come back as plain strings, numbers, or Mongo `{"$oid": ...}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntryId {
    Text(String),
    Number(i64),
    Object {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawEntryId::deserialize(deserializer)? {
            RawEntryId::Text(id) | RawEntryId::Object { oid: id } => Self(id),
            RawEntryId::Number(id) => Self(id.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JournalEntry {
    /// Absent for entries synthesized from non-JSON responses.
    #[serde(default, alias = "_id")]
    pub id: Option<EntryId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, deserialize_with = "deserialize_entry_date")]
    pub date: Option<OffsetDateTime>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_entry_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_entry_date(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized entry date: {raw}")))
}

/// Parse an RFC 3339 timestamp, or an offset-less one taken as UTC.
pub fn parse_entry_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(date) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339)
    {
        return Some(date);
    }

    let local = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(raw, local)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

impl JournalEntry {
    /// The single entry standing in for a plain-text list response.
    pub fn from_text(text: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            id: None,
            title: TEXT_RESPONSE_TITLE.to_string(),
            content: text.into(),
            date: Some(now),
        }
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    pub fn preview(&self) -> String {
        preview(&self.content, PREVIEW_LENGTH)
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn preview(content: &str, max_chars: usize) -> String {
    if content.is_empty() {
        return "No content available...".to_string();
    }
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let truncated: String = content.chars().take(max_chars).collect();
    format!("{truncated}...")
}

/// The three shapes a list response comes in.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    Sequence(Vec<JournalEntry>),
    Single(JournalEntry),
    Text(String),
}

impl TryFrom<ResponseBody> for EntryPayload {
    type Error = ApiError;

    fn try_from(body: ResponseBody) -> Result<Self, Self::Error> {
        match body {
            ResponseBody::Text(text) => Ok(Self::Text(text)),
            ResponseBody::Json(Value::String(text)) => Ok(Self::Text(text)),
            ResponseBody::Json(Value::Null) => Ok(Self::Sequence(Vec::new())),
            ResponseBody::Json(value @ Value::Array(_)) => {
                Ok(Self::Sequence(serde_json::from_value(value)?))
            }
            ResponseBody::Json(value @ Value::Object(_)) => {
                Ok(Self::Single(serde_json::from_value(value)?))
            }
            ResponseBody::Json(other) => Err(ApiError::invalid_response(format!(
                "expected journal entries, got {other}"
            ))),
        }
    }
}

/// Collapse a payload into an ordered list of entries. Never fails.
pub fn normalize(payload: EntryPayload, now: OffsetDateTime) -> Vec<JournalEntry> {
    match payload {
        EntryPayload::Sequence(entries) => entries,
        EntryPayload::Single(entry) => vec![entry],
        EntryPayload::Text(text) => vec![JournalEntry::from_text(text, now)],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryStats {
    pub total_entries: usize,
    pub words_written: usize,
    pub streak: usize,
}

impl EntryStats {
    pub fn from_entries(entries: &[JournalEntry]) -> Self {
        Self {
            total_entries: entries.len(),
            words_written: entries.iter().map(JournalEntry::word_count).sum(),
            streak: entries.len().min(MAX_STREAK_DAYS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            Self::NewestFirst => Self::OldestFirst,
            Self::OldestFirst => Self::NewestFirst,
        }
    }
}

/// The journal list screen's in-memory state. Ordering and filtering are
/// derived on demand and never sent back to the backend.
#[derive(Debug, Clone, Default)]
pub struct EntryList {
    entries: Vec<JournalEntry>,
    pub search: String,
    pub order: SortOrder,
}

impl EntryList {
    pub fn new(entries: Vec<JournalEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn replace(&mut self, entries: Vec<JournalEntry>) {
        self.entries = entries;
    }

    /// Drop an entry whose delete the backend has confirmed.
    pub fn remove(&mut self, id: &EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id.as_ref() != Some(id));
        self.entries.len() != before
    }

    pub fn discard(&mut self) {
        self.entries.clear();
    }

    /// Feed a lifecycle event to the list. Any sign-out discards the loaded
    /// entries, so a list held by a view never outlives its session.
    pub fn on_session_event(&mut self, event: &SessionEvent) {
        if let SessionEvent::SignedOut { reason } = event {
            tracing::debug!(?reason, "discarding entry list");
            self.discard();
        }
    }

    pub fn visible(&self) -> Vec<&JournalEntry> {
        let needle = self.search.trim().to_lowercase();
        let mut visible: Vec<&JournalEntry> = self
            .entries
            .iter()
            .filter(|entry| needle.is_empty() || entry.matches(&needle))
            .collect();

        // Undated entries compare as oldest.
        visible.sort_by(|a, b| match self.order {
            SortOrder::NewestFirst => b.date.cmp(&a.date),
            SortOrder::OldestFirst => a.date.cmp(&b.date),
        });
        visible
    }

    pub fn stats(&self) -> EntryStats {
        EntryStats::from_entries(&self.entries)
    }
}

/// Body for create and update calls.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl EntryDraft {
    pub fn new(title: &str, content: &str, date: OffsetDateTime) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            date,
        }
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{AuthMethod, LogoutReason};
    use serde_json::json;
    use time::macros::datetime;

    fn entry(id: &str, title: &str, content: &str, date: Option<OffsetDateTime>) -> JournalEntry {
        JournalEntry {
            id: Some(EntryId::new(id)),
            title: title.to_string(),
            content: content.to_string(),
            date,
        }
    }

    #[test]
    fn ids_normalize_from_every_backend_shape() {
        let plain: JournalEntry = serde_json::from_value(json!({"id": "abc"})).unwrap();
        let number: JournalEntry = serde_json::from_value(json!({"id": 42})).unwrap();
        let oid: JournalEntry =
            serde_json::from_value(json!({"_id": {"$oid": "65f0c1"}})).unwrap();
        let missing: JournalEntry = serde_json::from_value(json!({"title": "t"})).unwrap();

        assert_eq!(plain.id, Some(EntryId::new("abc")));
        assert_eq!(number.id, Some(EntryId::new("42")));
        assert_eq!(oid.id, Some(EntryId::new("65f0c1")));
        assert_eq!(missing.id, None);
    }

    #[test]
    fn null_fields_decode_to_defaults() {
        let entry: JournalEntry =
            serde_json::from_value(json!({"id": "1", "title": null, "content": null, "date": null}))
                .unwrap();
        assert_eq!(entry.title, "");
        assert_eq!(entry.content, "");
        assert_eq!(entry.date, None);
    }

    #[test]
    fn dates_accept_rfc3339_and_local_timestamps() {
        assert_eq!(
            parse_entry_date("2024-05-01T10:00:00Z"),
            Some(datetime!(2024-05-01 10:00 UTC))
        );
        assert_eq!(
            parse_entry_date("2024-05-01T10:00:00.123"),
            Some(datetime!(2024-05-01 10:00:00.123 UTC))
        );
        assert_eq!(
            parse_entry_date("2024-05-01T12:00:00+02:00"),
            Some(datetime!(2024-05-01 10:00 UTC))
        );
        assert_eq!(parse_entry_date("yesterday"), None);
    }

    #[test]
    fn sequence_keeps_its_length() {
        let now = datetime!(2024-05-01 10:00 UTC);
        let payload = EntryPayload::try_from(ResponseBody::Json(json!([
            {"id": "1", "title": "a", "content": "x"},
            {"id": "2", "title": "b", "content": "y"},
            {"id": "3", "title": "c", "content": "z"},
        ])))
        .unwrap();

        assert_eq!(normalize(payload, now).len(), 3);
    }

    #[test]
    fn single_object_is_wrapped() {
        let now = datetime!(2024-05-01 10:00 UTC);
        let payload =
            EntryPayload::try_from(ResponseBody::Json(json!({"id": "1", "title": "a"}))).unwrap();

        let entries = normalize(payload, now);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "a");
    }

    #[test]
    fn plain_text_becomes_a_synthesized_entry() {
        let now = datetime!(2024-05-01 10:00 UTC);
        let payload = EntryPayload::try_from(ResponseBody::Text("hello".into())).unwrap();

        assert_eq!(
            normalize(payload, now),
            vec![JournalEntry {
                id: None,
                title: "Response".into(),
                content: "hello".into(),
                date: Some(now),
            }]
        );
    }

    #[test]
    fn scalar_json_is_rejected_before_normalizing() {
        let err = EntryPayload::try_from(ResponseBody::Json(json!(17))).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn null_json_is_an_empty_sequence() {
        let payload = EntryPayload::try_from(ResponseBody::Json(Value::Null)).unwrap();
        assert_eq!(payload, EntryPayload::Sequence(vec![]));
    }

    #[test]
    fn stats_count_words_on_whitespace() {
        let entries = vec![
            entry("1", "a", "one two\tthree", None),
            entry("2", "b", "  four\n\nfive ", None),
            entry("3", "c", "", None),
        ];
        let stats = EntryStats::from_entries(&entries);

        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.words_written, 5);
        assert_eq!(stats.streak, 3);
    }

    #[test]
    fn streak_is_capped_at_a_week() {
        let entries: Vec<_> = (0..10).map(|i| entry(&i.to_string(), "t", "c", None)).collect();
        assert_eq!(EntryStats::from_entries(&entries).streak, 7);
    }

    #[test]
    fn list_filters_case_insensitively_and_sorts_by_date() {
        let mut list = EntryList::new(vec![
            entry("1", "Morning run", "felt good", Some(datetime!(2024-05-01 08:00 UTC))),
            entry("2", "Work", "long MEETING day", Some(datetime!(2024-05-03 18:00 UTC))),
            entry("3", "Notes", "meeting prep", Some(datetime!(2024-05-02 09:00 UTC))),
            entry("4", "Undated", "meeting", None),
        ]);

        list.search = "Meeting".into();
        let ids: Vec<_> = list
            .visible()
            .iter()
            .map(|e| e.id.clone().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["2", "3", "4"]);

        list.order = list.order.toggled();
        let ids: Vec<_> = list
            .visible()
            .iter()
            .map(|e| e.id.clone().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["4", "3", "2"]);
    }

    #[test]
    fn remove_and_discard() {
        let mut list = EntryList::new(vec![entry("1", "a", "b", None), entry("2", "c", "d", None)]);

        assert!(list.remove(&EntryId::new("1")));
        assert!(!list.remove(&EntryId::new("1")));
        assert_eq!(list.entries().len(), 1);

        list.discard();
        assert!(list.entries().is_empty());
        assert_eq!(list.stats(), EntryStats::default());
    }

    #[test]
    fn sign_out_discards_the_list() {
        let mut list = EntryList::new(vec![entry("1", "a", "b", None)]);

        list.on_session_event(&SessionEvent::SignedIn {
            username: "ana".into(),
            method: AuthMethod::Password,
        });
        assert_eq!(list.entries().len(), 1);

        list.on_session_event(&SessionEvent::SignedOut {
            reason: LogoutReason::Unauthorized,
        });
        assert!(list.entries().is_empty());
    }

    #[test]
    fn preview_truncates_long_content() {
        let long = "x".repeat(130);
        assert_eq!(preview(&long, 120), format!("{}...", "x".repeat(120)));
        assert_eq!(preview("short", 120), "short");
        assert_eq!(preview("", 120), "No content available...");
    }

    #[test]
    fn draft_trims_and_serializes_rfc3339() {
        let draft = EntryDraft::new("  Title ", " some words here \n", datetime!(2024-05-01 10:00 UTC));
        assert_eq!(draft.word_count(), 3);
        assert_eq!(draft.char_count(), 15);

        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            body,
            json!({"title": "Title", "content": "some words here", "date": "2024-05-01T10:00:00Z"})
        );
    }
}
