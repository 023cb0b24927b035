//! Recently accepted suggestions

use std::collections::VecDeque;

use super::SuggestionKind;

/// Bounded, most-recent-first list of accepted suggestions for one buffer
/// session. Never persisted.
#[derive(Debug, Clone)]
pub struct RecentlyAccepted {
    entries: VecDeque<(SuggestionKind, String)>,
    capacity: usize,
}

impl RecentlyAccepted {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an acceptance, moving an existing entry to the front
    pub fn accept(&mut self, kind: SuggestionKind, label: &str) {
        if self.capacity == 0 {
            return;
        }
        self.entries
            .retain(|(k, l)| !(*k == kind && l.eq_ignore_ascii_case(label)));
        self.entries.push_front((kind, label.to_string()));
        self.entries.truncate(self.capacity);
    }

    /// Position in the list, 0 for the most recent
    pub fn position(&self, kind: SuggestionKind, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, l)| *k == kind && l.eq_ignore_ascii_case(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RecentlyAccepted {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_first() {
        let mut recent = RecentlyAccepted::new(2);
        recent.accept(SuggestionKind::Identifier, "users");
        recent.accept(SuggestionKind::Keyword, "WHERE");
        recent.accept(SuggestionKind::Identifier, "Users");
        assert_eq!(recent.position(SuggestionKind::Identifier, "users"), Some(0));
        assert_eq!(recent.position(SuggestionKind::Keyword, "WHERE"), Some(1));
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut recent = RecentlyAccepted::new(1);
        recent.accept(SuggestionKind::Identifier, "a");
        recent.accept(SuggestionKind::Identifier, "b");
        assert_eq!(recent.position(SuggestionKind::Identifier, "a"), None);
    }

    #[test]
    fn test_kind_is_part_of_identity() {
        let mut recent = RecentlyAccepted::default();
        recent.accept(SuggestionKind::Function, "COUNT");
        assert_eq!(recent.position(SuggestionKind::Keyword, "COUNT"), None);
    }
}
