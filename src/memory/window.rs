//! Sliding history window
//!
//! Keeps the most recent entries of a conversation. Evicted entries are
//! dropped for good; nothing is summarized or archived.

use crate::models::{HistoryEntry, Role, Turn};
use tracing::warn;

/// Append a completed turn and keep only the last `window` entries.
pub fn trim(mut history: Vec<HistoryEntry>, turn: Turn, window: usize) -> Vec<HistoryEntry> {
    history.reserve(2);
    history.push(HistoryEntry::user(turn.user));
    history.push(HistoryEntry::model(turn.assistant));

    if history.len() > window {
        let excess = history.len() - window;
        history.drain(..excess);
    }

    history
}

/// Drop a trailing user entry that never got a reply.
///
/// Such an entry can only come from rows written by older versions that
/// stored a half turn. Returns the repaired history and whether anything
/// was removed.
pub fn repair(mut history: Vec<HistoryEntry>) -> (Vec<HistoryEntry>, bool) {
    let dangling = matches!(
        history.last(),
        Some(HistoryEntry { role: Role::User, .. })
    );

    if dangling {
        history.pop();
        warn!(
            remaining = history.len(),
            "Dropped unanswered trailing user entry from stored history"
        );
    }

    (history, dangling)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> Vec<HistoryEntry> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    HistoryEntry::user(format!("m{}", i))
                } else {
                    HistoryEntry::model(format!("m{}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_trim_appends_pair() {
        let trimmed = trim(Vec::new(), Turn::new("hi", "hello"), 20);
        assert_eq!(
            trimmed,
            vec![HistoryEntry::user("hi"), HistoryEntry::model("hello")]
        );
    }

    #[test]
    fn test_trim_length_is_bounded() {
        for len in [0, 2, 10, 18, 20, 24] {
            let trimmed = trim(numbered(len), Turn::new("u", "a"), 20);
            assert_eq!(trimmed.len(), (len + 2).min(20), "len {}", len);
        }
    }

    #[test]
    fn test_trim_drops_oldest_first() {
        let trimmed = trim(numbered(20), Turn::new("u", "a"), 20);

        let mut expected = numbered(20);
        expected.push(HistoryEntry::user("u"));
        expected.push(HistoryEntry::model("a"));
        let expected = expected[2..].to_vec();

        assert_eq!(trimmed, expected);
        assert_eq!(trimmed[0].text, "m2");
        assert_eq!(trimmed[0].role, Role::User);
    }

    #[test]
    fn test_trim_respects_custom_window() {
        let trimmed = trim(numbered(6), Turn::new("u", "a"), 4);
        assert_eq!(trimmed.len(), 4);
        assert_eq!(trimmed[0].text, "m4");
        assert_eq!(trimmed[3].text, "a");
    }

    #[test]
    fn test_repair_removes_dangling_user() {
        let (repaired, changed) = repair(numbered(3));
        assert!(changed);
        assert_eq!(repaired.len(), 2);

        let (repaired, changed) = repair(numbered(4));
        assert!(!changed);
        assert_eq!(repaired.len(), 4);

        let (repaired, changed) = repair(Vec::new());
        assert!(!changed);
        assert!(repaired.is_empty());
    }
}
