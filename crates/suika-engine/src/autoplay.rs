//! Automatic dropping, the pointer that can drive it, and the upcoming-fruit
//! preview.
//!
//! Holding the drop button longer than the autofire delay turns the
//! [`Autoplayer`] on and aims its drops at the pointer instead of at random
//! points. The next press stops it.

use std::collections::VecDeque;

use rand::Rng;
use suika_core::kind::{FruitKind, Position};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Autoplayer
// ---------------------------------------------------------------------------

/// Drops fruit at a steady rate, carrying fractional drops over as time debt.
#[derive(Debug, Clone)]
pub struct Autoplayer {
    enabled: bool,
    rate: u32,
    time_debt: f64,
    initial_rate: u32,
}

impl Autoplayer {
    pub fn new(initial_rate: u32) -> Self {
        Self {
            enabled: false,
            rate: 0,
            time_debt: 0.0,
            initial_rate,
        }
    }

    pub fn reset(&mut self) {
        self.rate = 0;
        self.disable();
    }

    /// Fruit per second.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        if self.rate == 0 {
            self.rate = self.initial_rate;
        }
        info!(rate = self.rate, "autoplay on");
    }

    pub fn disable(&mut self) {
        self.time_debt = 0.0;
        self.enabled = false;
    }

    pub fn toggle(&mut self) {
        if self.enabled {
            self.disable();
            info!("autoplay off");
        } else {
            self.enable();
        }
    }

    /// Change the rate by `adj` fruit per second, never below zero. Raising a
    /// zero rate jumps straight to the initial rate.
    pub fn adjust_rate(&mut self, adj: i32) {
        self.time_debt = 0.0;
        self.rate = if adj > 0 && self.rate == 0 {
            self.initial_rate
        } else {
            self.rate.saturating_add_signed(adj)
        };
        info!(rate = self.rate, "autoplay rate");
    }

    /// Number of fruit to drop during a step of `dt`.
    pub fn step(&mut self, dt: f64) -> u32 {
        if !self.enabled || self.rate == 0 {
            return 0;
        }
        let rate = f64::from(self.rate);
        let t = self.time_debt + dt;
        let nb = (t * rate).floor();
        self.time_debt = t - nb / rate;
        nb as u32
    }
}

// ---------------------------------------------------------------------------
// Pointer
// ---------------------------------------------------------------------------

/// Drop button and cursor state. Times are simulation seconds.
#[derive(Debug, Clone)]
pub struct Pointer {
    autofire_delay: f64,
    /// When the button went down; `None` while released.
    held_since: Option<f64>,
    autofire: bool,
    /// Last known cursor position; `None` until the pointer reports one.
    position: Option<Position>,
}

impl Pointer {
    pub fn new(autofire_delay: f64) -> Self {
        Self {
            autofire_delay,
            held_since: None,
            autofire: false,
            position: None,
        }
    }

    /// Button down at `position`.
    ///
    /// Returns true when the press only stopped a running autofire; such a
    /// press must not drop a fruit.
    pub fn press(&mut self, now: f64, position: Position) -> bool {
        let consumed = self.autofire;
        if consumed {
            self.autofire = false;
            debug!("autofire stopped");
        }
        self.held_since = Some(now);
        self.position = Some(position);
        consumed
    }

    /// Button up. A running autofire keeps going.
    pub fn release(&mut self) {
        if !self.autofire {
            self.held_since = None;
        }
    }

    pub fn motion(&mut self, position: Position) {
        self.position = Some(position);
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Whether autofire is on at `now`. It latches once the button has been
    /// held past the delay.
    pub fn autofire(&mut self, now: f64) -> bool {
        if let Some(start) = self.held_since {
            if !self.autofire && now - start > self.autofire_delay {
                self.autofire = true;
                debug!(held = now - start, "autofire started");
            }
        }
        self.autofire
    }

    /// Turn autofire off without a press.
    pub fn stop_autofire(&mut self) {
        self.autofire = false;
        self.held_since = None;
    }
}

// ---------------------------------------------------------------------------
// PreviewQueue
// ---------------------------------------------------------------------------

/// Upcoming drop kinds, drawn uniformly from the smallest kinds.
#[derive(Debug, Clone)]
pub struct PreviewQueue {
    kinds: VecDeque<FruitKind>,
    count: usize,
    drop_kinds: u8,
}

impl PreviewQueue {
    pub fn new<R: Rng + ?Sized>(count: usize, drop_kinds: u8, rng: &mut R) -> Self {
        let mut queue = Self {
            kinds: VecDeque::with_capacity(count + 1),
            count,
            drop_kinds: drop_kinds.clamp(1, FruitKind::COUNT),
        };
        queue.refill(rng);
        queue
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> FruitKind {
        let ordinal = rng.gen_range(1..=self.drop_kinds);
        FruitKind::new(ordinal).unwrap_or(FruitKind::MIN)
    }

    fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        while self.kinds.len() < self.count.max(1) {
            let kind = self.draw(rng);
            self.kinds.push_back(kind);
        }
    }

    /// Take the next kind and draw a replacement at the back.
    pub fn next_kind<R: Rng + ?Sized>(&mut self, rng: &mut R) -> FruitKind {
        let kind = self.kinds.pop_front().unwrap_or_else(|| self.draw(rng));
        self.refill(rng);
        kind
    }

    /// Upcoming kinds, next first.
    pub fn kinds(&self) -> impl Iterator<Item = FruitKind> + '_ {
        self.kinds.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
