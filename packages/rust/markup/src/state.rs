//! Enumeration state threaded through one conversion run.

use std::collections::HashMap;

/// Callout numbering for one document.
///
/// `counter` is the last ordinal handed out in the current enumeration scope.
/// `ordinals` remembers the ordinal each callout id was defined with, for the
/// whole document, so that references render the same number.
#[derive(Debug, Default)]
pub struct EnumerationState {
    counter: usize,
    ordinals: HashMap<String, usize>,
    pending: Vec<PendingReference>,
}

/// A callout reference rendered before its definition was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    pub section: usize,
    pub id: String,
}

impl EnumerationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new enumeration scope.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Number a callout definition. An id that already has an ordinal keeps
    /// it and does not advance the counter.
    pub fn define(&mut self, id: &str) -> usize {
        if let Some(&ordinal) = self.ordinals.get(id) {
            return ordinal;
        }
        self.counter += 1;
        self.ordinals.insert(id.to_string(), self.counter);
        self.counter
    }

    /// Number a callout item that carries no id.
    pub fn next_anonymous(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    pub fn ordinal(&self, id: &str) -> Option<usize> {
        self.ordinals.get(id).copied()
    }

    /// Remember a reference that could not be numbered yet.
    pub fn defer(&mut self, section: usize, id: &str) {
        self.pending.push(PendingReference {
            section,
            id: id.to_string(),
        });
    }

    /// Deferred references whose id was never defined.
    pub fn unresolved(&self) -> impl Iterator<Item = &PendingReference> {
        self.pending
            .iter()
            .filter(|pending| !self.ordinals.contains_key(&pending.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_is_assigned_once_per_id() {
        let mut state = EnumerationState::new();
        assert_eq!(state.define("p1"), 1);
        assert_eq!(state.define("p2"), 2);
        assert_eq!(state.define("p1"), 1);
        assert_eq!(state.counter(), 2);
        assert_eq!(state.ordinal("p2"), Some(2));
    }

    #[test]
    fn reset_starts_a_new_scope_but_keeps_ordinals() {
        let mut state = EnumerationState::new();
        state.define("p1");
        state.define("p2");
        state.reset();
        assert_eq!(state.define("p3"), 1);
        assert_eq!(state.ordinal("p2"), Some(2));
        assert_eq!(state.next_anonymous(), 2);
    }

    #[test]
    fn unresolved_lists_only_undefined_targets() {
        let mut state = EnumerationState::new();
        state.defer(1, "later");
        state.defer(1, "never");
        state.define("later");
        let open: Vec<&str> = state.unresolved().map(|p| p.id.as_str()).collect();
        assert_eq!(open, vec!["never"]);
    }
}
