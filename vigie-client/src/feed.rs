//! Bounded announcement feed shared between the ticker task and its readers

use crate::models::UpdateAnnouncement;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// The ticker keeps this many announcements; the next arrival evicts the oldest.
pub const FEED_CAPACITY: usize = 10;

/// Fixed-capacity ring of recent announcements, newest first. Ordering is
/// strictly arrival order: entries are never resorted by their embedded
/// timestamp.
#[derive(Debug, Default)]
pub struct AnnouncementFeed {
    entries: VecDeque<UpdateAnnouncement>,
}

impl AnnouncementFeed {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(FEED_CAPACITY + 1),
        }
    }

    /// Prepends an announcement, evicting the oldest entry once over capacity.
    pub fn push(&mut self, announcement: UpdateAnnouncement) {
        self.entries.push_front(announcement);
        if self.entries.len() > FEED_CAPACITY {
            self.entries.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the current entries, newest first.
    pub fn snapshot(&self) -> Vec<UpdateAnnouncement> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnnouncementKind;
    use chrono::{TimeZone, Utc};

    fn announcement(n: u32) -> UpdateAnnouncement {
        UpdateAnnouncement {
            kind: AnnouncementKind::Message,
            message: format!("m{n}"),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, n).unwrap(),
        }
    }

    #[test]
    fn newest_first() {
        let mut feed = AnnouncementFeed::new();
        feed.push(announcement(1));
        feed.push(announcement(2));

        let entries = feed.snapshot();
        assert_eq!(entries[0].message, "m2");
        assert_eq!(entries[1].message, "m1");
    }

    #[test]
    fn eleventh_arrival_evicts_the_oldest() {
        let mut feed = AnnouncementFeed::new();
        for n in 1..=11 {
            feed.push(announcement(n));
        }

        let entries = feed.snapshot();
        assert_eq!(entries.len(), FEED_CAPACITY);
        let messages: Vec<&str> = entries.iter().map(|a| a.message.as_str()).collect();
        let expected: Vec<String> = (2..=11).rev().map(|n| format!("m{n}")).collect();
        assert_eq!(messages, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn arrival_order_wins_over_timestamps() {
        let mut feed = AnnouncementFeed::new();
        // later timestamp arrives first; the feed must not resort
        feed.push(announcement(9));
        feed.push(announcement(3));

        let entries = feed.snapshot();
        assert_eq!(entries[0].message, "m3");
        assert_eq!(entries[1].message, "m9");
    }
}
