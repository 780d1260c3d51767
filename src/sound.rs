//! Tone notifications raised by the timer clock. Driving an actual audio device is left to the host.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Told once per timer tick while the sound timer is counting down.
pub trait ToneNotifier: Send {
    fn tone(&mut self);
}

/// Swallows every notification.
pub struct Mute;

impl ToneNotifier for Mute {
    fn tone(&mut self) {}
}

/// Counts notifications; the counter can be shared with whoever wants to read it.
#[derive(Clone, Default)]
pub struct ToneCounter {
    count: Arc<AtomicU64>,
}

impl ToneCounter {
    pub fn new() -> ToneCounter {
        ToneCounter::default()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

impl ToneNotifier for ToneCounter {
    fn tone(&mut self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_clones_share_count() {
        let reader = ToneCounter::new();
        let mut writer = reader.clone();
        writer.tone();
        writer.tone();
        assert_eq!(reader.count(), 2);
    }
}
