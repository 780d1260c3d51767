//! A collection of structs and functions used to represent the state of a CHIP-8 system.

use crate::error::Chip8Error;
use crate::input::KeySource;
use crate::program::{Instruction, Program};
use crate::timer::Timers;
use crate::utils::big_endian_8_2;
use log::{debug, error, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Size of the address space in bytes.
pub const MEMORY_SIZE: usize = 4096;
/// Where the font glyphs live.
pub const FONT_ADDR: u16 = 0x50;
/// Bytes per font glyph.
pub const FONT_GLYPH_LEN: u16 = 5;
/// Where programs are loaded, and where execution starts.
pub const PROGRAM_ADDR: u16 = 0x200;
pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// Glyphs for the 16 hexadecimal digits, 5 rows of 4 pixels each (the low nibble of every row is blank).
#[rustfmt::skip]
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// A memory access that ran past the end of the address space. `address` is the first byte that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    pub address: usize,
}

impl OutOfBounds {
    /// Attaches the address of the instruction that made the access.
    pub fn at(self, pc: u16) -> Chip8Error {
        Chip8Error::AddressOutOfBounds {
            address: self.address,
            pc,
        }
    }
}

/// Represents the main memory of a CHIP-8 system: 4096 bytes, accessed through bounds-checked slices.
///
/// Nothing wraps around. Any access reaching past the last byte fails as a whole, before a single byte is touched.
pub struct Memory {
    memory: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Creates a new `Memory` object with the font already in place at `FONT_ADDR`.
    pub fn new() -> Memory {
        let mut memory = [0u8; MEMORY_SIZE];
        let font = FONT_ADDR as usize;
        memory[font..font + FONT.len()].copy_from_slice(&FONT);
        Memory { memory }
    }

    fn range(&self, address: usize, len: usize) -> Result<Range<usize>, OutOfBounds> {
        match address.checked_add(len) {
            Some(end) if end <= MEMORY_SIZE => Ok(address..end),
            _ => Err(OutOfBounds {
                address: address.max(MEMORY_SIZE),
            }),
        }
    }

    /// Borrows `len` bytes starting at `address`.
    pub fn read(&self, address: usize, len: usize) -> Result<&[u8], OutOfBounds> {
        let range = self.range(address, len)?;
        Ok(&self.memory[range])
    }

    /// Copies `data` into memory starting at `address`.
    pub fn write(&mut self, address: usize, data: &[u8]) -> Result<(), OutOfBounds> {
        let range = self.range(address, data.len())?;
        self.memory[range].copy_from_slice(data);
        Ok(())
    }

    /// Reads the big-endian instruction word at `address`.
    pub fn word(&self, address: usize) -> Result<u16, OutOfBounds> {
        let bytes = self.read(address, 2)?;
        Ok(big_endian_8_2(bytes[0], bytes[1]))
    }

    /// Copies a program image to `PROGRAM_ADDR`. Images that do not fit are refused outright.
    pub fn load_program(&mut self, program: &Program) -> Result<(), Chip8Error> {
        let capacity = MEMORY_SIZE - PROGRAM_ADDR as usize;
        if program.len() > capacity {
            return Err(Chip8Error::ProgramTooLarge {
                len: program.len(),
                capacity,
            });
        }
        self.write(PROGRAM_ADDR as usize, &program.instructions)
            .map_err(|e| e.at(PROGRAM_ADDR))
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl std::fmt::Display for Memory {
    /// Formats the `Memory` as a table of width 32 and height 128, where each cell corresponds to the current value
    /// of the byte it represents.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "     ")?;
        for i in 0..32 {
            write!(f, "{:02X} ", i)?;
        }
        writeln!(f)?;
        writeln!(f, "     {}", "-".repeat(32 * 3))?;
        for (row, bytes) in self.memory.chunks(32).enumerate() {
            write!(f, "{:03X}: ", row * 32)?;
            for byte in bytes {
                write!(f, "{:02X} ", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Represents the register array of the CHIP-8 processor.
///
/// A CHIP-8 processor has 16 `V` registers and one `I` register.
/// The `V` registers each hold a single unsigned byte and are named `V0, V1, ..., VF`. `VF` doubles as the flag
/// register, written by arithmetic, shift and draw instructions.
/// The `I` register holds an address used by the instructions that read or write memory.
#[derive(Default)]
pub struct Registers {
    v: [u8; 16],
    i: u16,
}

impl Registers {
    /// Creates a new `Registers` object with every register at `0`.
    pub fn new() -> Registers {
        Registers::default()
    }

    /// Fetches the `V` register addressed by `idx`. Only the low nibble of `idx` is used, so every index is valid.
    pub fn get(&self, idx: u8) -> u8 {
        self.v[(idx & 0xF) as usize]
    }

    /// Stores `val` in the `V` register addressed by `idx`. Only the low nibble of `idx` is used.
    pub fn set(&mut self, idx: u8, val: u8) {
        self.v[(idx & 0xF) as usize] = val;
    }

    /// The flag register `VF`.
    pub fn vf(&self) -> u8 {
        self.v[0xF]
    }

    /// Stores `value` in `VF`.
    pub fn set_vf(&mut self, value: u8) {
        self.v[0xF] = value;
    }

    /// The index register `I`. It holds the full 16-bit value even when that points past main memory.
    pub fn i(&self) -> u16 {
        self.i
    }

    /// Stores `val` in `I`.
    ///
    /// # Example
    /// ```
    /// use chip8_vm::system::Registers;
    /// let mut regs = Registers::new();
    /// regs.set_i(0x2A0);
    /// assert_eq!(regs.i(), 0x2A0);
    /// ```
    pub fn set_i(&mut self, val: u16) {
        self.i = val;
    }

    /// All 16 `V` registers, `V0` first.
    pub fn all(&self) -> &[u8; 16] {
        &self.v
    }
}

/// Represents the Stack used to store return addresses for `CALL` and `RETURN`. Real machines kept it in main memory
/// with a handful of slots; here it is a separate structure with (practically) unlimited storage.
#[derive(Default)]
pub struct Stack {
    stack: Vec<u16>,
}

impl Stack {
    /// Creates an empty `Stack`.
    pub fn new() -> Stack {
        Stack::default()
    }

    /// Pushes a return address.
    pub fn push(&mut self, val: u16) {
        self.stack.push(val);
    }

    /// Removes the topmost value, or returns `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<u16> {
        self.stack.pop()
    }

    /// Current call depth.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// The 64x32 monochrome screen, row-major. Only `clear` and `draw_sprite` change it.
pub struct Framebuffer {
    pixels: [[bool; SCREEN_WIDTH]; SCREEN_HEIGHT],
}

impl Framebuffer {
    /// Creates a new `Framebuffer` with every pixel `OFF`.
    pub fn new() -> Framebuffer {
        Framebuffer {
            pixels: [[false; SCREEN_WIDTH]; SCREEN_HEIGHT],
        }
    }

    /// Turns every pixel `OFF`.
    pub fn clear(&mut self) {
        self.pixels = [[false; SCREEN_WIDTH]; SCREEN_HEIGHT];
    }

    /// Whether the pixel at column `x`, row `y` is set. Coordinates outside the screen read as unset.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// Read-only view of the whole grid for renderers.
    pub fn rows(&self) -> &[[bool; SCREEN_WIDTH]; SCREEN_HEIGHT] {
        &self.pixels
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().flatten().filter(|p| **p).count()
    }

    /// Flips the pixel at the given coordinates, returning `true` if it was set before.
    fn flip(&mut self, x: usize, y: usize) -> bool {
        let pixel = &mut self.pixels[y][x];
        let was_set = *pixel;
        *pixel = !was_set;
        was_set
    }

    /// XORs an 8-pixel-wide sprite onto the screen with its top-left corner at (`x`, `y`), one byte per row.
    ///
    /// The sprite wraps around both edges. Only set bits touch the screen. Returns `true` if any set bit landed on a
    /// pixel that was already on.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            let target_y = (y as usize + row) % SCREEN_HEIGHT;
            for bit in 0..8 {
                if byte & (0x80 >> bit) == 0 {
                    continue;
                }
                let target_x = (x as usize + bit) % SCREEN_WIDTH;
                if self.flip(target_x, target_y) {
                    collision = true;
                }
            }
        }
        collision
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer::new()
    }
}

impl std::fmt::Display for Framebuffer {
    /// Formats the screen as 32 lines of 64 characters, `█` for a set pixel and a space otherwise.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.pixels.iter() {
            let line: String = row.iter().map(|p| if *p { '█' } else { ' ' }).collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// Host-chosen knobs for running a `System`.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Pace of `run`. `0` runs as fast as possible.
    pub instructions_per_second: u32,
    /// Stop `run` after this many steps. `None` runs until a fatal error.
    pub max_steps: Option<u64>,
    /// Seed for the `Cxnn` random source. `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            instructions_per_second: 700,
            max_steps: None,
            seed: None,
        }
    }
}

/// A struct representing the state of a CHIP-8 processor and its peripherals.
///
/// The timers sit behind an `Arc` so a `TimerClock` can run them down from its own thread; everything else belongs to
/// whoever is stepping the machine.
pub struct System {
    pub memory: Memory,
    pub registers: Registers,
    pub stack: Stack,
    pub framebuffer: Framebuffer,
    pub timers: Arc<Timers>,

    pub rng: StdRng,

    pub pc: u16,
    cycles: u64,
    config: RunConfig,
}

impl System {
    /// Creates a new `System` with the default `RunConfig`.
    ///
    /// # Example
    /// ```
    /// use chip8_vm::system::{System, PROGRAM_ADDR};
    /// let sys = System::new();
    /// assert_eq!(sys.pc, PROGRAM_ADDR);
    /// ```
    pub fn new() -> System {
        System::with_config(RunConfig::default())
    }

    /// Creates a new `System` driven by `config`. The random generator is seeded from `config.seed`, or from the
    /// operating system when no seed is given.
    ///
    /// # Example
    /// ```
    /// use chip8_vm::system::{RunConfig, System};
    /// let sys = System::with_config(RunConfig { max_steps: Some(10), ..RunConfig::default() });
    /// assert_eq!(sys.config().max_steps, Some(10));
    /// ```
    pub fn with_config(config: RunConfig) -> System {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        System {
            memory: Memory::new(),
            registers: Registers::new(),
            stack: Stack::new(),
            framebuffer: Framebuffer::new(),
            timers: Arc::new(Timers::new()),
            rng,
            pc: PROGRAM_ADDR,
            cycles: 0,
            config,
        }
    }

    /// A `System` whose random instructions replay the same sequence on every run.
    pub fn with_seed(seed: u64) -> System {
        System::with_config(RunConfig {
            seed: Some(seed),
            ..RunConfig::default()
        })
    }

    /// Loads a program into main memory at `PROGRAM_ADDR` and points the PC at it.
    pub fn load(&mut self, program: &Program) -> Result<(), Chip8Error> {
        self.memory.load_program(program)?;
        self.pc = PROGRAM_ADDR;
        info!("loaded program of {} bytes at {:#05X}", program.len(), PROGRAM_ADDR);
        Ok(())
    }

    /// A handle on the timers, for a `TimerClock` or anyone else that needs them.
    pub fn timers(&self) -> Arc<Timers> {
        Arc::clone(&self.timers)
    }

    /// The configuration this `System` was created with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Number of instructions executed successfully so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Skips the next instruction when `condition` holds.
    pub fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc += 2;
        }
    }

    /// Runs one fetch/decode/execute step.
    ///
    /// The word at the PC is fetched and decoded before the PC moves, so a word that cannot be fetched or decoded
    /// leaves the machine untouched. If execution itself fails the PC is put back on the failing instruction.
    pub fn step<K>(&mut self, keys: &mut K) -> Result<(), Chip8Error>
    where
        K: KeySource + ?Sized,
    {
        let at = self.pc;
        let word = self.memory.word(at as usize).map_err(|e| e.at(at))?;
        let instruction = Instruction::decode(word).ok_or(Chip8Error::InvalidInstruction { opcode: word, pc: at })?;
        trace!("{:03X}: {:04X}  {}", at, word, instruction);

        self.pc = at + 2;
        if let Err(e) = instruction.execute(self, keys, at) {
            self.pc = at;
            return Err(e);
        }
        self.cycles += 1;
        Ok(())
    }

    /// Starts running the fetch/decode/execute loop at `instructions_per_second`, until `max_steps` is reached or a
    /// step fails. Returns the number of steps taken.
    ///
    /// Timers are not touched here; run a `TimerClock` alongside.
    pub fn run<K>(&mut self, keys: &mut K) -> Result<u64, Chip8Error>
    where
        K: KeySource + ?Sized,
    {
        let period = match self.config.instructions_per_second {
            0 => Duration::ZERO,
            ips => Duration::from_secs(1) / ips,
        };
        debug!(
            "running at {} instructions/s, limit {:?}",
            self.config.instructions_per_second, self.config.max_steps
        );

        let mut steps = 0u64;
        let mut deadline = Instant::now();
        let mut rate = StepRate::new(deadline);
        while self.config.max_steps.map_or(true, |limit| steps < limit) {
            if let Err(e) = self.step(keys) {
                error!("halted after {} steps: {}", steps, e);
                return Err(e);
            }
            steps += 1;
            if let Some(n) = rate.record(Instant::now()) {
                debug!("{} instructions in the last second", n);
            }

            if !period.is_zero() {
                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    spin_sleep::sleep(deadline - now);
                }
            }
        }
        debug!("step limit reached after {} steps", steps);
        Ok(steps)
    }
}

/// Counts steps over one-second windows, for reporting the achieved rate.
struct StepRate {
    window_start: Instant,
    steps: u64,
}

impl StepRate {
    fn new(now: Instant) -> StepRate {
        StepRate { window_start: now, steps: 0 }
    }

    /// Counts one step taken at `now`. Returns the window's total once a full second has passed, and starts a new one.
    fn record(&mut self, now: Instant) -> Option<u64> {
        self.steps += 1;
        if now.duration_since(self.window_start) < Duration::from_secs(1) {
            return None;
        }
        let steps = self.steps;
        self.window_start = now;
        self.steps = 0;
        Some(steps)
    }
}

impl Default for System {
    fn default() -> Self {
        System::new()
    }
}
