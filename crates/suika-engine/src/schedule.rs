//! Simulation-time timers.
//!
//! [`Scheduler`] holds items to release after a delay measured in simulation
//! seconds. Scheduled items always fire; there is no cancellation.

use serde::{Deserialize, Serialize};
use suika_core::kind::{FruitKind, Position};

/// A merged fruit waiting to appear, in container-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub kind: FruitKind,
    pub local: Position,
}

#[derive(Debug)]
struct Timer<T> {
    due: f64,
    seq: u64,
    item: T,
}

/// Deterministic one-shot timer queue.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: f64,
    next_seq: u64,
    pending: Vec<Timer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release `item` once `delay` more seconds have elapsed.
    pub fn schedule_once(&mut self, delay: f64, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Timer {
            due: self.now + delay.max(0.0),
            seq,
            item,
        });
    }

    /// Advance the clock by `dt` and return every due item, ordered by due
    /// time then scheduling order.
    pub fn advance(&mut self, dt: f64) -> Vec<T> {
        self.now += dt;
        let now = self.now;
        let (mut due, pending): (Vec<Timer<T>>, Vec<Timer<T>>) =
            std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|t| t.due <= now);
        self.pending = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|t| t.item).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending items in scheduling order.
    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.pending.iter().map(|t| &t.item)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_fire_after_their_delay() {
        let mut s = Scheduler::new();
        s.schedule_once(0.3, "spawn");
        assert!(s.advance(0.2).is_empty());
        assert_eq!(s.advance(0.2), vec!["spawn"]);
        assert!(s.is_empty());
    }

    #[test]
    fn due_items_are_ordered_by_time_then_insertion() {
        let mut s = Scheduler::new();
        s.schedule_once(0.5, 'c');
        s.schedule_once(0.1, 'a');
        s.schedule_once(0.5, 'd');
        s.schedule_once(0.1, 'b');
        assert_eq!(s.advance(1.0), vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn delay_is_relative_to_current_time() {
        let mut s = Scheduler::new();
        s.advance(10.0);
        s.schedule_once(1.0, 1);
        assert!(s.advance(0.5).is_empty());
        assert_eq!(s.len(), 1);
        assert_eq!(s.advance(0.5), vec![1]);
    }

    #[test]
    fn pending_lists_items_in_scheduling_order() {
        let mut s = Scheduler::new();
        s.schedule_once(0.9, "late");
        s.schedule_once(0.1, "early");
        assert_eq!(s.pending().copied().collect::<Vec<_>>(), vec!["late", "early"]);
        s.advance(0.5);
        assert_eq!(s.pending().copied().collect::<Vec<_>>(), vec!["late"]);
    }
}
