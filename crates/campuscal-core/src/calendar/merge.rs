//! Structural merge of calendar texts.
//!
//! This is a line-level concatenation, not an iCalendar parser: the outer
//! `VCALENDAR` lines of every input are dropped and the remaining lines are
//! wrapped once in a fresh envelope. Nothing is validated, reordered or
//! deduplicated.

use std::fmt;

pub const ENVELOPE_BEGIN: &str = "BEGIN:VCALENDAR";
pub const ENVELOPE_END: &str = "END:VCALENDAR";

const EVENT_BEGIN: &str = "BEGIN:VEVENT";

/// Line terminator used in the merged output (RFC 5545).
const LINE_ENDING: &str = "\r\n";

/// A single calendar document built from any number of month exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedCalendar {
    text: String,
}

impl MergedCalendar {
    /// Wrap a previously written artifact as-is.
    pub fn from_artifact(text: String) -> Self {
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn event_count(&self) -> usize {
        count_events(&self.text)
    }
}

impl fmt::Display for MergedCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn is_envelope_line(line: &str) -> bool {
    line.starts_with(ENVELOPE_BEGIN) || line.starts_with(ENVELOPE_END)
}

/// Merge calendar texts in the given order under one envelope.
pub fn merge_all<I, S>(calendars: I) -> MergedCalendar
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    text.push_str(ENVELOPE_BEGIN);
    text.push_str(LINE_ENDING);

    for calendar in calendars {
        for line in calendar.as_ref().lines().filter(|l| !is_envelope_line(l)) {
            text.push_str(line);
            text.push_str(LINE_ENDING);
        }
    }

    text.push_str(ENVELOPE_END);
    text.push_str(LINE_ENDING);
    MergedCalendar { text }
}

/// Count `BEGIN:VEVENT` lines.
pub fn count_events(text: &str) -> usize {
    text.lines().filter(|l| l.starts_with(EVENT_BEGIN)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAY: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nSUMMARY:Lineare Algebra\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    const JUNE: &str = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:Programmierung\nEND:VEVENT\nBEGIN:VEVENT\nSUMMARY:Tutorium\nEND:VEVENT\nEND:VCALENDAR\n";

    fn count(haystack: &str, line: &str) -> usize {
        haystack.lines().filter(|l| *l == line).count()
    }

    #[test]
    fn test_single_envelope() {
        let merged = merge_all([MAY, JUNE]);
        assert_eq!(count(merged.as_str(), ENVELOPE_BEGIN), 1);
        assert_eq!(count(merged.as_str(), ENVELOPE_END), 1);
        assert!(merged.as_str().starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(merged.as_str().ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_body_lines_kept_once_in_input_order() {
        let merged = merge_all([MAY, JUNE]);
        let body: Vec<&str> = merged
            .as_str()
            .lines()
            .filter(|l| !is_envelope_line(l))
            .collect();

        let expected: Vec<&str> = MAY
            .lines()
            .chain(JUNE.lines())
            .filter(|l| !is_envelope_line(l))
            .collect();

        assert_eq!(body, expected);
    }

    #[test]
    fn test_input_order_is_preserved() {
        let forward = merge_all([MAY, JUNE]);
        let backward = merge_all([JUNE, MAY]);

        let first_summary = |m: &MergedCalendar| {
            m.as_str()
                .lines()
                .find(|l| l.starts_with("SUMMARY:"))
                .map(str::to_string)
        };
        assert_eq!(first_summary(&forward).as_deref(), Some("SUMMARY:Lineare Algebra"));
        assert_eq!(first_summary(&backward).as_deref(), Some("SUMMARY:Programmierung"));
    }

    #[test]
    fn test_no_deduplication() {
        let merged = merge_all([MAY, MAY]);
        assert_eq!(count(merged.as_str(), "SUMMARY:Lineare Algebra"), 2);
        assert_eq!(merged.event_count(), 2);
    }

    #[test]
    fn test_envelope_prefix_match() {
        // Anything starting with the envelope markers is dropped, trailing junk included
        let merged = merge_all(["BEGIN:VCALENDAR \nX-FOO:bar\nEND:VCALENDAR;x\n"]);
        assert_eq!(merged.as_str(), "BEGIN:VCALENDAR\r\nX-FOO:bar\r\nEND:VCALENDAR\r\n");
    }

    #[test]
    fn test_empty_input() {
        let merged = merge_all(Vec::<String>::new());
        assert_eq!(merged.as_str(), "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n");
        assert_eq!(merged.event_count(), 0);
    }

    #[test]
    fn test_count_events() {
        assert_eq!(count_events(MAY), 1);
        assert_eq!(count_events(JUNE), 2);
        assert_eq!(count_events(""), 0);
    }
}
