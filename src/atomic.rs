use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored as its bit pattern in an `AtomicU32`.
///
/// Used for parameters written from the control thread and read from the
/// audio callback, where a lock is not an option. Last write wins.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}
