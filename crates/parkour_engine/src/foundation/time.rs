//! Simulation time input
//!
//! The core never reads the wall clock. Each tick it asks a [`FrameClock`]
//! for the elapsed simulation time; the frame loop that owns real timing
//! lives outside this crate.

/// Source of the elapsed simulation time for the current tick
pub trait FrameClock {
    /// Seconds of simulated time covered by this tick
    fn tick_seconds(&self) -> f32;
}

/// Fixed-step clock for deterministic stepping
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    max_step: f32,
    total_time: f64,
    frame_count: u64,
}

impl FixedTimestep {
    /// Create a clock that reports `step` seconds per tick
    pub fn new(step: f32) -> Self {
        Self {
            step,
            max_step: 0.1,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Create a clock from a tick rate in hertz
    pub fn from_hz(hz: f32) -> Self {
        Self::new(1.0 / hz)
    }

    /// Upper bound applied to the reported step
    pub fn with_max_step(mut self, max_step: f32) -> Self {
        self.max_step = max_step;
        self
    }

    /// Record that one tick has been simulated
    pub fn advance(&mut self) {
        self.total_time += f64::from(self.tick_seconds());
        self.frame_count += 1;
    }

    /// Total simulated time in seconds
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Number of ticks simulated so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::from_hz(60.0)
    }
}

impl FrameClock for FixedTimestep {
    fn tick_seconds(&self) -> f32 {
        self.step.clamp(0.0, self.max_step)
    }
}

impl FrameClock for f32 {
    fn tick_seconds(&self) -> f32 {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_step_accumulates() {
        let mut clock = FixedTimestep::from_hz(50.0);
        for _ in 0..50 {
            clock.advance();
        }
        assert_eq!(clock.frame_count(), 50);
        assert_relative_eq!(clock.total_time(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_step_is_clamped() {
        let clock = FixedTimestep::new(2.0).with_max_step(0.25);
        assert_relative_eq!(clock.tick_seconds(), 0.25);
    }
}
