//! Cooperative timer queue
//!
//! A single-owner replacement for interval/timeout handles. Timers carry a
//! value describing what to do when they fire; the owner dispatches them.
//! Timers due at the same instant fire in scheduling order.

/// Handle returned by [`TimerQueue::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Entry<K> {
    id: TimerId,
    due_ms: u64,
    kind: K,
}

/// Pending timers ordered by due time
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    entries: Vec<Entry<K>>,
    next_id: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `kind` to fire at `due_ms`
    pub fn schedule(&mut self, due_ms: u64, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        // Stable insert: after every entry due at or before `due_ms`
        let pos = self.entries.partition_point(|e| e.due_ms <= due_ms);
        self.entries.insert(pos, Entry { id, due_ms, kind });
        id
    }

    /// Cancel a pending timer. Returns false if it already fired or was cleared.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove and return the earliest timer due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, K)> {
        match self.entries.first() {
            Some(entry) if entry.due_ms <= now_ms => {
                let entry = self.entries.remove(0);
                Some((entry.due_ms, entry.kind))
            }
            _ => None,
        }
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<u64> {
        self.entries.first().map(|e| e.due_ms)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
