//! Reference-counted string interning.

use std::collections::HashMap;
use std::sync::Arc;

struct Entry {
    value: Arc<str>,
    refs: usize,
}

/// Interns strings shared across many counters, so each distinct
/// tenant, dataset and owner name is stored once.
///
/// Every `acquire` must be paired with a `release`; the string is
/// dropped when its last reference goes away.
#[derive(Default)]
pub struct Dictionary {
    entries: HashMap<String, Entry>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the interned copy of `s`, bumping its reference count.
    pub fn acquire(&mut self, s: &str) -> Arc<str> {
        match self.entries.get_mut(s) {
            Some(entry) => {
                entry.refs += 1;
                entry.value.clone()
            }
            None => {
                let value: Arc<str> = Arc::from(s);
                self.entries.insert(
                    s.to_owned(),
                    Entry {
                        value: value.clone(),
                        refs: 1,
                    },
                );
                value
            }
        }
    }

    /// Drops one reference to `s`, removing the entry when none remain.
    pub fn release(&mut self, s: &str) {
        if let Some(entry) = self.entries.get_mut(s) {
            entry.refs -= 1;
            if entry.refs == 0 {
                self.entries.remove(s);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_returns_same_allocation() {
        let mut d = Dictionary::new();
        let a = d.acquire("tenant-a");
        let b = d.acquire("tenant-a");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_release_drops_entry_at_zero() {
        let mut d = Dictionary::new();
        d.acquire("x");
        d.acquire("x");
        d.release("x");
        assert_eq!(d.len(), 1);
        d.release("x");
        assert!(d.is_empty());
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let mut d = Dictionary::new();
        d.release("never-seen");
        assert!(d.is_empty());
    }
}
