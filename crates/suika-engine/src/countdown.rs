//! Overflow countdown.
//!
//! Runs while at least one settled fruit touches the redline and resets as
//! soon as none does. The game is over once it has run for the whole delay.

/// Time the redline has been continuously occupied.
#[derive(Debug, Clone)]
pub struct Countdown {
    /// Occupation time after which the game is over.
    delay: f64,
    /// `None` while the redline is clear.
    elapsed: Option<f64>,
}

impl Countdown {
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            elapsed: None,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = None;
    }

    /// Advance by `dt` given whether the redline is occupied.
    pub fn update(&mut self, dt: f64, occupied: bool) {
        self.elapsed = if occupied {
            Some(self.elapsed.map_or(0.0, |e| e + dt))
        } else {
            None
        };
    }

    /// Seconds left before game over, `None` while the redline is clear.
    /// Negative once expired.
    pub fn remaining(&self) -> Option<f64> {
        self.elapsed.map(|e| self.delay - e)
    }

    pub fn is_running(&self) -> bool {
        self.elapsed.is_some()
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_some_and(|r| r < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_continuous_occupation() {
        let mut c = Countdown::new(1.0);
        for _ in 0..10 {
            c.update(0.1, true);
        }
        assert!(c.is_running());
        assert!(!c.expired());
        c.update(0.2, true);
        assert!(c.expired());
    }

    #[test]
    fn clearing_the_line_resets() {
        let mut c = Countdown::new(1.0);
        c.update(0.1, true);
        c.update(0.9, true);
        c.update(0.1, false);
        assert_eq!(c.remaining(), None);
        c.update(0.1, true);
        assert_eq!(c.remaining(), Some(1.0));
    }
}
