use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::calendar::{merge_all, MergedCalendar, MonthCalendar, MonthKey};

/// A value together with the time it was produced.
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }
}

/// Month-keyed calendar cache.
///
/// Entries are kept in month order, so the merged output is chronological.
#[derive(Debug, Default, Clone)]
pub struct CalendarCache {
    entries: BTreeMap<MonthKey, MonthCalendar>,
}

impl CalendarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every month not cached yet. Months already present are left
    /// untouched, even if the new export differs.
    ///
    /// Returns the months that were inserted, in month order.
    pub fn refresh<I>(&mut self, calendars: I) -> Vec<MonthKey>
    where
        I: IntoIterator<Item = MonthCalendar>,
    {
        let mut inserted = Vec::new();
        for calendar in calendars {
            let month = calendar.month();
            if let Entry::Vacant(slot) = self.entries.entry(month) {
                slot.insert(calendar);
                inserted.push(month);
            }
        }
        inserted.sort();
        inserted
    }

    pub fn get(&self, month: &MonthKey) -> Option<&MonthCalendar> {
        self.entries.get(month)
    }

    pub fn contains(&self, month: &MonthKey) -> bool {
        self.entries.contains_key(month)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached months, oldest first.
    pub fn months(&self) -> Vec<MonthKey> {
        self.entries.keys().copied().collect()
    }

    /// Merge every cached month into one calendar.
    pub fn merged(&self) -> MergedCalendar {
        merge_all(self.entries.values().map(MonthCalendar::text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).expect("valid month")
    }

    fn calendar(year: i32, month: u32, summary: &str) -> MonthCalendar {
        MonthCalendar::new(
            key(year, month),
            format!(
                "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:{}\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
                summary
            ),
        )
    }

    #[test]
    fn test_refresh_inserts_absent_months() {
        let mut cache = CalendarCache::new();
        let inserted = cache.refresh(vec![calendar(2024, 6, "B"), calendar(2024, 5, "A")]);

        assert_eq!(inserted, vec![key(2024, 5), key(2024, 6)]);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key(2024, 5)));
    }

    #[test]
    fn test_refresh_is_idempotent_on_present_month() {
        let mut cache = CalendarCache::new();
        cache.refresh(vec![calendar(2024, 5, "first")]);
        let before = cache.merged();

        let inserted = cache.refresh(vec![calendar(2024, 5, "second")]);

        assert!(inserted.is_empty());
        assert_eq!(cache.merged(), before);
        let kept = cache.get(&key(2024, 5)).expect("cached");
        assert!(kept.text().contains("SUMMARY:first"));
    }

    #[test]
    fn test_refresh_is_monotonic() {
        let mut cache = CalendarCache::new();
        cache.refresh(vec![calendar(2024, 5, "A"), calendar(2024, 6, "B")]);
        let before = cache.months();

        cache.refresh(Vec::new());
        cache.refresh(vec![calendar(2024, 7, "C")]);

        let after = cache.months();
        assert!(before.iter().all(|m| after.contains(m)));
        assert_eq!(after, vec![key(2024, 5), key(2024, 6), key(2024, 7)]);
    }

    #[test]
    fn test_merged_is_chronological() {
        let mut cache = CalendarCache::new();
        cache.refresh(vec![calendar(2024, 7, "July")]);
        cache.refresh(vec![calendar(2024, 5, "May")]);

        let merged = cache.merged();
        let text = merged.as_str();
        let may = text.find("SUMMARY:May").expect("may present");
        let july = text.find("SUMMARY:July").expect("july present");
        assert!(may < july);
        assert_eq!(text.matches("BEGIN:VCALENDAR").count(), 1);
        assert_eq!(merged.event_count(), 2);
    }
}
