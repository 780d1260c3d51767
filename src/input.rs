//! The keypad as seen by the interpreter.
//!
//! Mapping physical keys to the 16-key namespace is the host's job; the machine only ever asks which key is down
//! right now.

/// Reports the key currently held on the 16-key keypad.
pub trait KeySource {
    /// `None` when no key is pressed, otherwise a value in `0x0..=0xF`.
    fn pressed_key(&mut self) -> Option<u8>;
}

/// A keypad nobody touches.
pub struct NoInput;

impl KeySource for NoInput {
    fn pressed_key(&mut self) -> Option<u8> {
        None
    }
}

/// A keypad with one key held down for as long as it lives.
pub struct HeldKey(u8);

impl HeldKey {
    /// Only the low nibble of `key` is kept.
    pub fn new(key: u8) -> HeldKey {
        HeldKey(key & 0xF)
    }
}

impl KeySource for HeldKey {
    fn pressed_key(&mut self) -> Option<u8> {
        Some(self.0)
    }
}

/// Replays a scripted sequence of key states, one per query, then reports no key.
///
/// Useful for driving `Fx0A` waits in tests and demos.
pub struct ScriptedInput {
    states: std::collections::VecDeque<Option<u8>>,
}

impl ScriptedInput {
    pub fn new(states: &[Option<u8>]) -> ScriptedInput {
        ScriptedInput {
            states: states.iter().map(|s| s.map(|k| k & 0xF)).collect(),
        }
    }
}

impl KeySource for ScriptedInput {
    fn pressed_key(&mut self) -> Option<u8> {
        self.states.pop_front().flatten()
    }
}
