//! A CHIP-8 virtual machine core.
//!
//! The machine has 4 KB of memory, 16 8-bit `V` registers (`VF` doubling as the flag), an index register, a call stack,
//! a 64x32 monochrome framebuffer and two 60 Hz countdown timers. A host drives it by calling [`System::step`] (or
//! [`System::run`]) at whatever rate it likes, while a [`TimerClock`] decays the timers in real time on its own thread.
//!
//! Rendering, audio and keyboard mapping live with the host. The machine reads keys through [`KeySource`], announces
//! tones through [`ToneNotifier`], and exposes its framebuffer for reading.
//!
//! ```
//! use chip8_vm::{NoInput, Program, System, PROGRAM_ADDR};
//!
//! let mut sys = System::new();
//! sys.load(&Program::from_bytes(&[0xA2, 0x2A, 0x60, 0x05]))?;
//! sys.step(&mut NoInput)?;
//! sys.step(&mut NoInput)?;
//! assert_eq!(sys.registers.i(), 0x22A);
//! assert_eq!(sys.registers.get(0), 5);
//! assert_eq!(sys.pc, PROGRAM_ADDR + 4);
//! # Ok::<(), chip8_vm::Chip8Error>(())
//! ```

pub mod error;
pub mod input;
pub mod program;
pub mod sound;
pub mod system;
pub mod timer;
pub mod utils;

pub use error::Chip8Error;
pub use input::{HeldKey, KeySource, NoInput, ScriptedInput};
pub use program::{Instruction, Program};
pub use sound::{Mute, ToneCounter, ToneNotifier};
pub use system::{
    Framebuffer, RunConfig, System, FONT_ADDR, MEMORY_SIZE, PROGRAM_ADDR, SCREEN_HEIGHT, SCREEN_WIDTH,
};
pub use timer::{TimerClock, Timers, TIMER_FREQUENCY};
