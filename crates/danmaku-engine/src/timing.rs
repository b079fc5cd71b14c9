//! Fixed timestep driver.
//!
//! Turns variable frame deltas into a whole number of fixed simulation ticks.

/// Accumulator for fixed-rate simulation ticks.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    /// Seconds per tick
    fixed_dt: f32,
    /// Largest frame delta accepted
    max_dt: f32,
    /// Tick budget per frame
    max_updates: u32,
    /// Unsimulated time carried to the next frame
    accumulator: f32,
    /// Ticks produced so far
    total_ticks: u64,
    /// Frames whose backlog was dropped
    dropped_frames: u64,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FixedTimestep {
    /// Create a driver ticking `tick_rate` times per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            max_dt: 0.25,
            max_updates: 10,
            accumulator: 0.0,
            total_ticks: 0,
            dropped_frames: 0,
        }
    }

    /// Set the largest frame delta accepted.
    #[must_use]
    pub fn with_max_delta(mut self, max_dt: f32) -> Self {
        self.max_dt = max_dt.max(self.fixed_dt);
        self
    }

    /// Set the tick budget per frame.
    #[must_use]
    pub fn with_max_updates(mut self, max_updates: u32) -> Self {
        self.max_updates = max_updates.max(1);
        self
    }

    /// Seconds per tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Accumulate a frame delta.
    /// Returns the number of fixed ticks that should be run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return 0;
        }
        self.accumulator += frame_dt.min(self.max_dt);

        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < self.max_updates {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after the budget: drop the backlog (spiral of death)
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
            self.dropped_frames += 1;
        }

        self.total_ticks += u64::from(count);
        count
    }

    /// Fraction of a tick left in the accumulator, for interpolation.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.fixed_dt).clamp(0.0, 1.0)
    }

    /// Ticks produced since creation or the last reset.
    #[must_use]
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Frames whose backlog was dropped.
    #[must_use]
    pub const fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Reset timing (call after pause or loading).
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.total_ticks = 0;
        self.dropped_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_timestep() {
        let mut timing = FixedTimestep::new(60);

        // 32ms frame should trigger 1 or 2 fixed ticks
        let updates = timing.accumulate(0.032);
        assert!(updates == 1 || updates == 2);
    }

    #[test]
    fn test_carries_remainder() {
        let mut timing = FixedTimestep::new(10);
        assert_eq!(timing.accumulate(0.05), 0);
        assert!((timing.alpha() - 0.5).abs() < 1e-4);
        assert_eq!(timing.accumulate(0.06), 1);
        assert_eq!(timing.total_ticks(), 1);
    }

    #[test]
    fn test_accumulate_spiral_prevention() {
        let mut timing = FixedTimestep::new(60).with_max_delta(1.0).with_max_updates(10);

        // Simulate huge lag spike
        let updates = timing.accumulate(1.0);

        assert_eq!(updates, 10);
        assert_eq!(timing.dropped_frames(), 1);
        assert_eq!(timing.alpha(), 0.0);
    }

    #[test]
    fn test_max_delta_clamps_frame() {
        let mut timing = FixedTimestep::new(10).with_max_delta(0.25);
        assert_eq!(timing.accumulate(5.0), 2);
        assert_eq!(timing.dropped_frames(), 0);
    }

    #[test]
    fn test_ignores_bad_deltas() {
        let mut timing = FixedTimestep::new(60);
        assert_eq!(timing.accumulate(-1.0), 0);
        assert_eq!(timing.accumulate(f32::NAN), 0);
        assert_eq!(timing.alpha(), 0.0);
    }

    #[test]
    fn test_reset_timing() {
        let mut timing = FixedTimestep::new(60);
        timing.accumulate(0.1);
        timing.reset();

        assert_eq!(timing.total_ticks(), 0);
        assert_eq!(timing.alpha(), 0.0);
    }
}
