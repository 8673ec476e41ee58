use std::collections::VecDeque;
use std::time::Instant;

/// Compteur de ticks rendus par fenêtre glissante.
///
/// Feeds the optional `--show-fps` overlay. Timestamps are passed in by the
/// caller, so the counter works with the real clock or with test instants.
///
/// # Example
/// ```
/// use ab_render::fps::FpsCounter;
/// use std::time::{Duration, Instant};
///
/// let mut counter = FpsCounter::new(30);
/// let t0 = Instant::now();
/// counter.record(t0);
/// counter.record(t0 + Duration::from_millis(100));
/// assert!((counter.fps() - 10.0).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct FpsCounter {
    stamps: VecDeque<Instant>,
    window: usize,
}

impl FpsCounter {
    /// Average over the last `window` ticks (at least 2).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            stamps: VecDeque::with_capacity(window + 1),
            window,
        }
    }

    /// Record a tick at `now`.
    pub fn record(&mut self, now: Instant) {
        self.stamps.push_back(now);
        while self.stamps.len() > self.window {
            self.stamps.pop_front();
        }
    }

    /// Ticks par seconde sur la fenêtre, 0 tant qu'il y a moins de deux ticks.
    #[must_use]
    pub fn fps(&self) -> f64 {
        match (self.stamps.front(), self.stamps.back()) {
            (Some(first), Some(last)) if self.stamps.len() >= 2 => {
                let secs = last.duration_since(*first).as_secs_f64();
                if secs > 0.0 {
                    (self.stamps.len() - 1) as f64 / secs
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// Forget all recorded ticks (after a remount).
    pub fn reset(&mut self) {
        self.stamps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_until_two_ticks() {
        let mut counter = FpsCounter::new(10);
        assert!(counter.fps().abs() < f64::EPSILON);
        counter.record(Instant::now());
        assert!(counter.fps().abs() < f64::EPSILON);
    }

    #[test]
    fn window_slides() {
        let mut counter = FpsCounter::new(3);
        let t0 = Instant::now();
        // Deux ticks lents puis trois rapides : seule la fin compte.
        counter.record(t0);
        counter.record(t0 + Duration::from_secs(1));
        for i in 1..=3 {
            counter.record(t0 + Duration::from_secs(1) + Duration::from_millis(20 * i));
        }
        assert!((counter.fps() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn reset_clears() {
        let mut counter = FpsCounter::new(5);
        let t0 = Instant::now();
        counter.record(t0);
        counter.record(t0 + Duration::from_millis(16));
        assert!(counter.fps() > 0.0);
        counter.reset();
        assert!(counter.fps().abs() < f64::EPSILON);
    }
}
