//! Encode progress shared between the worker and the producer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Fraction of an encode job completed, in `[0, 1]`
///
/// Cloning yields another handle to the same value. Each job creates a fresh
/// `Progress`, so a reading never carries over from a previous job. Updates
/// only ever move the value forward.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    bits: Arc<AtomicU32>,
}

impl Progress {
    /// Create a progress value at 0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current fraction completed
    #[must_use]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Advance by `delta`, saturating at 1.0. Negative deltas are ignored.
    pub fn advance(&self, delta: f32) {
        if delta.is_nan() || delta <= 0.0 {
            return;
        }
        self.update(|current| current + delta);
    }

    /// Mark the job complete
    pub fn complete(&self) {
        self.update(|_| 1.0);
    }

    /// Whether the job reached 1.0
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.get() >= 1.0
    }

    fn update(&self, next: impl Fn(f32) -> f32) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let current = f32::from_bits(bits);
                let proposed = next(current).clamp(0.0, 1.0);
                (proposed > current).then(|| proposed.to_bits())
            });
    }
}
