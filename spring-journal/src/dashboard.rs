use crate::entry::{EntryStats, JournalEntry};

/// Everything the dashboard shows after one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// `None` when the greeting call failed; the rest of the dashboard still
    /// loads.
    pub greeting: Option<String>,
    pub entries: Vec<JournalEntry>,
    pub stats: EntryStats,
}

impl Dashboard {
    pub fn new(greeting: Option<String>, entries: Vec<JournalEntry>) -> Self {
        let stats = EntryStats::from_entries(&entries);
        Self {
            greeting,
            entries,
            stats,
        }
    }
}

pub fn salutation(hour: u8) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salutation_boundaries() {
        assert_eq!(salutation(0), "Good morning");
        assert_eq!(salutation(11), "Good morning");
        assert_eq!(salutation(12), "Good afternoon");
        assert_eq!(salutation(16), "Good afternoon");
        assert_eq!(salutation(17), "Good evening");
        assert_eq!(salutation(23), "Good evening");
    }

    #[test]
    fn stats_are_derived_from_entries() {
        let entries = vec![JournalEntry::from_text(
            "three little words",
            time::OffsetDateTime::UNIX_EPOCH,
        )];
        let dashboard = Dashboard::new(None, entries);

        assert_eq!(dashboard.stats.total_entries, 1);
        assert_eq!(dashboard.stats.words_written, 3);
    }
}
