//! Global tick clock
//!
//! One fixed-size step of simulated time per tick. Anything that needs to run
//! on a seconds-based cadence keeps its own accumulator fed from `seconds_per_tick`.

use crate::core::types::Tick;

#[derive(Debug, Clone)]
pub struct TickClock {
    tick: Tick,
    seconds_per_tick: f32,
}

impl TickClock {
    pub fn new(seconds_per_tick: f32) -> Self {
        Self {
            tick: 0,
            seconds_per_tick,
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn seconds_per_tick(&self) -> f32 {
        self.seconds_per_tick
    }

    /// Total simulated seconds since start
    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 * self.seconds_per_tick as f64
    }

    /// Advance one tick, returning the new tick number
    pub fn advance(&mut self) -> Tick {
        self.tick += 1;
        self.tick
    }
}

/// Fires once every `interval_secs` of simulated time
#[derive(Debug, Clone)]
pub struct Cadence {
    interval_secs: f32,
    accumulated: f32,
}

impl Cadence {
    pub fn new(interval_secs: f32) -> Self {
        Self {
            interval_secs,
            accumulated: 0.0,
        }
    }

    /// Feed elapsed time; returns true when the interval has been reached
    pub fn step(&mut self, dt: f32) -> bool {
        self.accumulated += dt;
        if self.accumulated >= self.interval_secs {
            self.accumulated -= self.interval_secs;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let mut clock = TickClock::new(0.5);
        for _ in 0..10 {
            clock.advance();
        }
        assert_eq!(clock.current_tick(), 10);
        assert!((clock.elapsed_secs() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_cadence_fires_on_interval() {
        let mut cadence = Cadence::new(1.0);
        let fired: Vec<bool> = (0..8).map(|_| cadence.step(0.25)).collect();
        assert_eq!(fired, vec![false, false, false, true, false, false, false, true]);
    }
}
