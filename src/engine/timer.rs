//! Cancelable timers on the agent's virtual clock
//!
//! Timers are keyed by their due time; timers that share a due time fire in
//! the order they were scheduled.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle returned by [`TimerQueue::schedule_at`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Ordered collection of pending timers carrying payloads of type `E`
#[derive(Debug)]
pub struct TimerQueue<E> {
    entries: BTreeMap<(Duration, u64), E>,
    due_by_id: HashMap<u64, Duration>,
    next_id: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            due_by_id: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedule `event` to fire at `due`
    pub fn schedule_at(&mut self, due: Duration, event: E) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((due, id), event);
        self.due_by_id.insert(id, due);
        TimerId(id)
    }

    /// Cancel a pending timer, returning its payload if it had not fired
    pub fn cancel(&mut self, id: TimerId) -> Option<E> {
        let due = self.due_by_id.remove(&id.0)?;
        self.entries.remove(&(due, id.0))
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_by_id.contains_key(&id.0)
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<Duration> {
        self.entries.keys().next().map(|&(due, _)| due)
    }

    /// Remove and return the earliest timer if it is due at or before `now`
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, TimerId, E)> {
        let &(due, id) = self.entries.keys().next()?;
        if due > now {
            return None;
        }
        self.due_by_id.remove(&id);
        let event = self.entries.remove(&(due, id))?;
        Some((due, TimerId(id), event))
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.entries.clear();
        self.due_by_id.clear();
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

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_pop_in_due_order() {
        let mut timers = TimerQueue::new();
        timers.schedule_at(ms(300), "c");
        timers.schedule_at(ms(100), "a");
        timers.schedule_at(ms(200), "b");

        assert_eq!(timers.next_due(), Some(ms(100)));
        assert_eq!(timers.pop_due(ms(250)).map(|(_, _, e)| e), Some("a"));
        assert_eq!(timers.pop_due(ms(250)).map(|(_, _, e)| e), Some("b"));
        assert!(timers.pop_due(ms(250)).is_none());
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_equal_due_fires_in_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule_at(ms(10), 1);
        timers.schedule_at(ms(10), 2);
        timers.schedule_at(ms(10), 3);

        let fired: Vec<i32> = std::iter::from_fn(|| timers.pop_due(ms(10)).map(|(_, _, e)| e))
            .collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel() {
        let mut timers = TimerQueue::new();
        let a = timers.schedule_at(ms(10), "a");
        let b = timers.schedule_at(ms(20), "b");

        assert!(timers.is_pending(a));
        assert_eq!(timers.cancel(a), Some("a"));
        assert!(!timers.is_pending(a));
        assert_eq!(timers.cancel(a), None);

        assert_eq!(timers.next_due(), Some(ms(20)));
        let (due, id, event) = timers.pop_due(ms(20)).unwrap();
        assert_eq!((due, id, event), (ms(20), b, "b"));
        assert_eq!(timers.cancel(b), None);
    }

    #[test]
    fn test_clear() {
        let mut timers = TimerQueue::new();
        timers.schedule_at(ms(1), ());
        timers.schedule_at(ms(2), ());
        timers.clear();
        assert!(timers.is_empty());
        assert_eq!(timers.next_due(), None);
    }
}
