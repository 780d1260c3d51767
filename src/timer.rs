//! The delay and sound timers, and the clock that runs them down.
//!
//! Both counters are written by the interpreter (`Fx15`, `Fx18`) and decremented by the [`TimerClock`] thread, so
//! each one is a lone atomic. No operation touches both at once, so nothing wider than that is locked.

use crate::error::Chip8Error;
use crate::sound::ToneNotifier;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the timers count down, in Hz.
pub const TIMER_FREQUENCY: u32 = 60;

/// An 8-bit countdown. Once set it decrements on every tick until it reaches `0`, where it stays.
#[derive(Default)]
pub struct Timer {
    value: AtomicU8,
}

impl Timer {
    /// Creates a `Timer` at `0`.
    pub fn new() -> Timer {
        Timer::default()
    }

    /// Overwrites the current value.
    pub fn set(&self, value: u8) {
        self.value.store(value, Ordering::Release);
    }

    /// The current value.
    pub fn get(&self) -> u8 {
        self.value.load(Ordering::Acquire)
    }

    /// Decrements by `1` if larger than `0`. Returns whether it did.
    ///
    /// The check and the decrement are one atomic step, so a concurrent `set` is never lost or taken below zero.
    pub fn tick(&self) -> bool {
        self.value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1))
            .is_ok()
    }
}

/// The pair of timers shared between the interpreter and the clock.
#[derive(Default)]
pub struct Timers {
    pub delay: Timer,
    pub sound: Timer,
}

impl Timers {
    /// Creates both timers at `0`.
    pub fn new() -> Timers {
        Timers::default()
    }

    /// One 1/60 s step: both timers decay, and the notifier hears a tone if the sound timer was still running.
    pub fn tick(&self, notifier: &mut dyn ToneNotifier) {
        self.delay.tick();
        if self.sound.tick() {
            notifier.tone();
        }
    }
}

/// Background thread ticking a [`Timers`] at [`TIMER_FREQUENCY`] in wall-clock time, whatever the interpreter is doing.
///
/// Ticks are scheduled against absolute deadlines, so a late wake-up is caught up rather than stretching the period.
/// Dropping the clock stops the thread.
pub struct TimerClock {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerClock {
    pub fn start<N>(timers: Arc<Timers>, mut notifier: N) -> Result<TimerClock, Chip8Error>
    where
        N: ToneNotifier + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let period = Duration::from_secs(1) / TIMER_FREQUENCY;

        let handle = thread::Builder::new()
            .name("chip8-timers".to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                while flag.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if deadline > now {
                        spin_sleep::sleep(deadline - now);
                    }
                    timers.tick(&mut notifier);
                    deadline += period;
                }
                debug!("timer clock thread exiting");
            })?;

        info!("timer clock started at {} Hz", TIMER_FREQUENCY);
        Ok(TimerClock {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stops the thread and waits for it to finish its current tick.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("timer clock thread panicked");
            }
            info!("timer clock stopped");
        }
    }
}

impl Drop for TimerClock {
    fn drop(&mut self) {
        self.shutdown();
    }
}
