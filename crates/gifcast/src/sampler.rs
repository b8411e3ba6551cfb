//! Tick gating for frame capture.
//!
//! The render loop ticks far more often than frames are recorded; the sampler
//! says which ticks should capture.

/// Decides which render ticks capture a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSampler {
    interval: u32,
    elapsed: u32,
}

impl FrameSampler {
    /// Capture every `round(tick_rate / (record_fps * speed_multiplier))`-th tick
    ///
    /// A speed multiplier above 1.0 samples more often, which makes playback
    /// slower than real time. Degenerate inputs fall back to every tick.
    #[must_use]
    pub fn new(tick_rate: u32, record_fps: u32, speed_multiplier: f32) -> Self {
        let per_second = f64::from(record_fps) * f64::from(speed_multiplier);
        let interval = if per_second.is_finite() && per_second > 0.0 {
            (f64::from(tick_rate) / per_second).round().max(1.0) as u32
        } else {
            1
        };
        Self {
            interval,
            elapsed: 0,
        }
    }

    /// Ticks between captures
    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    /// Advance one tick; returns `true` when this tick should capture
    pub fn tick(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.interval {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }

    /// Restart counting from zero
    pub fn reset(&mut self) {
        self.elapsed = 0;
    }
}
