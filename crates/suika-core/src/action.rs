//! Deferred fruit transitions.
//!
//! Physics callbacks run inside the solver's step, while shapes are still
//! referenced by the contact iteration. They therefore never touch a fruit:
//! they push a [`FruitAction`] into the [`ActionQueue`], and the queue is
//! drained once, in insertion order, after the step has returned and the merge
//! decisions are final.
//!
//! # Example
//!
//! ```
//! use suika_core::prelude::*;
//!
//! let mut queue = ActionQueue::new();
//! queue.push(FruitAction::Normal(FruitId(3)));
//! queue.push(FruitAction::Explode(FruitId(1)));
//! assert_eq!(queue.len(), 2);
//! assert_eq!(queue.actions()[0].target(), FruitId(3));
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::kind::{FruitId, FruitKind, Position};

// ---------------------------------------------------------------------------
// FruitHost
// ---------------------------------------------------------------------------

/// The fruit subsystem as seen by the merge engine.
///
/// Lookups return `None` for fruit that no longer exist. Transitions on such
/// fruit must be ignored by the implementation.
pub trait FruitHost {
    fn kind(&self, fruit: FruitId) -> Option<FruitKind>;

    /// Current world position of the fruit's centre.
    fn position(&self, fruit: FruitId) -> Option<Position>;

    /// Start the explosion animation; the fruit leaves play.
    fn explode(&mut self, fruit: FruitId);

    /// Slide the fruit onto `dest`; the fruit leaves play.
    fn merge_to(&mut self, fruit: FruitId, dest: Position);

    /// Start blinking after `delay` seconds, or stop blinking.
    fn blink(&mut self, fruit: FruitId, activate: bool, delay: Option<f64>);

    /// Clear the first-drop flag so later contacts are ordinary ones.
    fn normal(&mut self, fruit: FruitId);
}

// ---------------------------------------------------------------------------
// FruitAction
// ---------------------------------------------------------------------------

/// A single deferred transition on one fruit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FruitAction {
    /// Leave first-drop mode.
    Normal(FruitId),
    /// Toggle the overflow warning.
    Blink {
        fruit: FruitId,
        activate: bool,
        delay: Option<f64>,
    },
    Explode(FruitId),
    MergeTo { fruit: FruitId, dest: Position },
}

impl FruitAction {
    /// The fruit this action transitions.
    pub fn target(&self) -> FruitId {
        match *self {
            FruitAction::Normal(fruit)
            | FruitAction::Explode(fruit)
            | FruitAction::Blink { fruit, .. }
            | FruitAction::MergeTo { fruit, .. } => fruit,
        }
    }

    pub fn apply<H: FruitHost + ?Sized>(&self, host: &mut H) {
        match *self {
            FruitAction::Normal(fruit) => host.normal(fruit),
            FruitAction::Blink {
                fruit,
                activate,
                delay,
            } => host.blink(fruit, activate, delay),
            FruitAction::Explode(fruit) => host.explode(fruit),
            FruitAction::MergeTo { fruit, dest } => host.merge_to(fruit, dest),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionQueue
// ---------------------------------------------------------------------------

/// FIFO of deferred fruit transitions for one simulation step.
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: Vec<FruitAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: FruitAction) {
        self.actions.push(action);
    }

    /// Queued actions in insertion order.
    pub fn actions(&self) -> &[FruitAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Drop every queued action without running it.
    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Run every queued action against `host` in insertion order.
    ///
    /// The queue is empty afterwards; the executed actions are returned so
    /// callers can report them.
    pub fn apply<H: FruitHost + ?Sized>(&mut self, host: &mut H) -> Vec<FruitAction> {
        let actions = std::mem::take(&mut self.actions);
        for action in &actions {
            trace!(?action, "applying deferred fruit action");
            action.apply(host);
        }
        actions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every transition it receives.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl FruitHost for Recorder {
        fn kind(&self, _fruit: FruitId) -> Option<FruitKind> {
            None
        }
        fn position(&self, _fruit: FruitId) -> Option<Position> {
            None
        }
        fn explode(&mut self, fruit: FruitId) {
            self.calls.push(format!("explode {fruit}"));
        }
        fn merge_to(&mut self, fruit: FruitId, dest: Position) {
            self.calls.push(format!("merge {fruit} -> ({}, {})", dest.x, dest.y));
        }
        fn blink(&mut self, fruit: FruitId, activate: bool, delay: Option<f64>) {
            self.calls.push(format!("blink {fruit} {activate} {delay:?}"));
        }
        fn normal(&mut self, fruit: FruitId) {
            self.calls.push(format!("normal {fruit}"));
        }
    }

    #[test]
    fn actions_run_in_insertion_order() {
        let mut queue = ActionQueue::new();
        queue.push(FruitAction::Blink {
            fruit: FruitId(1),
            activate: true,
            delay: Some(1.0),
        });
        queue.push(FruitAction::Normal(FruitId(2)));
        queue.push(FruitAction::Explode(FruitId(3)));
        queue.push(FruitAction::MergeTo {
            fruit: FruitId(4),
            dest: Position::new(1.0, 2.0),
        });

        let mut host = Recorder::default();
        let applied = queue.apply(&mut host);

        assert_eq!(applied.len(), 4);
        assert_eq!(
            host.calls,
            vec![
                "blink fruit#1 true Some(1.0)",
                "normal fruit#2",
                "explode fruit#3",
                "merge fruit#4 -> (1, 2)",
            ]
        );
    }

    #[test]
    fn apply_drains_the_queue() {
        let mut queue = ActionQueue::new();
        queue.push(FruitAction::Normal(FruitId(1)));
        let mut host = Recorder::default();
        queue.apply(&mut host);
        assert!(queue.is_empty());

        // A second apply runs nothing.
        assert!(queue.apply(&mut host).is_empty());
        assert_eq!(host.calls.len(), 1);
    }

    #[test]
    fn target_covers_every_variant() {
        let dest = Position::ORIGIN;
        assert_eq!(FruitAction::Normal(FruitId(5)).target(), FruitId(5));
        assert_eq!(FruitAction::Explode(FruitId(6)).target(), FruitId(6));
        assert_eq!(
            FruitAction::MergeTo {
                fruit: FruitId(7),
                dest
            }
            .target(),
            FruitId(7)
        );
        assert_eq!(
            FruitAction::Blink {
                fruit: FruitId(8),
                activate: false,
                delay: None
            }
            .target(),
            FruitId(8)
        );
    }
}
