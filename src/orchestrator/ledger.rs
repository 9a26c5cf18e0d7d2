//! De-duplication ledger of played clips.

use std::collections::HashSet;

/// Keys that already started playing in the current session.
#[derive(Debug, Default, Clone)]
pub struct PlayedLedger {
    keys: HashSet<String>,
}

impl PlayedLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key. Returns true if it was new.
    pub fn record(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    /// Returns true if the key was recorded.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Removes the given keys.
    pub fn forget<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.keys.remove(key);
        }
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Number of recorded keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
