//! Priority queue of pending regular requests.

use uuid::Uuid;

/// One pending regular request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Unique per enqueue; kept across retries
    pub id: Uuid,
    /// Clip key
    pub key: String,
    /// Key recorded in the ledger once the entry plays
    pub ledger_key: String,
    /// Higher plays first
    pub priority: i32,
    /// Number of failed starts so far
    pub retry_count: u32,
}

impl QueueEntry {
    /// Creates a fresh entry.
    pub fn new(key: impl Into<String>, ledger_key: impl Into<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            ledger_key: ledger_key.into(),
            priority,
            retry_count: 0,
        }
    }

    /// Returns this entry with the retry count bumped.
    #[must_use]
    pub fn retried(mut self) -> Self {
        self.retry_count += 1;
        self
    }
}

/// Entries sorted by descending priority, FIFO within a priority.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: Vec<QueueEntry>,
}

impl PendingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry and re-sorts.
    ///
    /// A re-queued retry counts as a new insertion and lands behind entries
    /// of equal priority.
    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push(entry);
        // Stable sort: equal priorities keep insertion order.
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Removes and returns the highest-priority entry.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Returns true if an entry with this ledger key is pending.
    pub fn contains(&self, ledger_key: &str) -> bool {
        self.entries.iter().any(|e| e.ledger_key == ledger_key)
    }

    /// Clip keys in dequeue order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
