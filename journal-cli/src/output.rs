use spring_journal::dashboard::{salutation, Dashboard};
use spring_journal::entry::{JournalEntry, SortOrder};
use spring_journal::profile::ProfileSettings;
use time::{macros::format_description, OffsetDateTime, UtcOffset};

pub fn format_date(date: Option<OffsetDateTime>) -> String {
    let Some(date) = date else {
        return "Date not available".to_string();
    };
    let local = date.to_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC));
    local
        .format(format_description!(
            "[month repr:short] [day padding:none], [year] [hour]:[minute]"
        ))
        .unwrap_or_else(|_| date.to_string())
}

fn entry_id(entry: &JournalEntry) -> String {
    entry
        .id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

pub fn entry_line(entry: &JournalEntry) -> String {
    format!(
        "[{}] {}  ({})\n    {}",
        entry_id(entry),
        entry.title,
        format_date(entry.date),
        entry.preview()
    )
}

pub fn entry_full(entry: &JournalEntry) -> String {
    format!(
        "{}\n{}\nid: {}  words: {}\n\n{}",
        entry.title,
        format_date(entry.date),
        entry_id(entry),
        entry.word_count(),
        entry.content
    )
}

pub fn entry_list(entries: &[&JournalEntry], order: SortOrder) -> String {
    if entries.is_empty() {
        return "No journal entries found.".to_string();
    }
    let header = match order {
        SortOrder::NewestFirst => "Newest first",
        SortOrder::OldestFirst => "Oldest first",
    };
    let lines: Vec<String> = entries.iter().map(|entry| entry_line(entry)).collect();
    format!("{} ({} entries)\n\n{}", header, entries.len(), lines.join("\n"))
}

pub fn dashboard(dashboard: &Dashboard, username: &str, now: OffsetDateTime) -> String {
    let mut out = format!("{}, {}!\n", salutation(now.hour()), username);
    if let Some(greeting) = &dashboard.greeting {
        out.push_str(&format!("\n{}\n", greeting.trim()));
    }
    out.push_str(&format!(
        "\nEntries: {}   Words written: {}   Streak: {} days\n",
        dashboard.stats.total_entries, dashboard.stats.words_written, dashboard.stats.streak
    ));

    if dashboard.entries.is_empty() {
        out.push_str("\nNo entries yet. Start with `journal new --title ...`.\n");
        return out;
    }

    out.push_str("\nRecent entries\n");
    for entry in dashboard.entries.iter().take(5) {
        out.push_str(&entry_line(entry));
        out.push('\n');
    }
    out
}

pub fn profile(profile: &ProfileSettings) -> String {
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };
    let email = if profile.email.is_empty() {
        "(not set)"
    } else {
        profile.email.as_str()
    };
    format!(
        "Username:              {}\nEmail:                 {}\nSentiment analysis:    {}\nJournal summarization: {}",
        profile.username,
        email,
        on_off(profile.sentiment_analysis),
        on_off(profile.journal_summarization)
    )
}
