//! Contains the types for programs that can be run on the system. `Program` holds the raw bytes of a program image.
//! `Instruction` is one decoded instruction, and knows how to run itself against a `System`.

use crate::error::Chip8Error;
use crate::input::KeySource;
use crate::system::{self, FONT_ADDR, FONT_GLYPH_LEN, PROGRAM_ADDR};
use crate::utils::{big_endian_4_2, big_endian_4_3, big_endian_8_2, nibbles};
use rand::Rng;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// One decoded instruction. `x` and `y` are register indices, `nn` an 8-bit immediate, `nnn` a 12-bit address, `n` a
/// nibble.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    ClearScreen,
    Return,
    Jump { nnn: u16 },
    Call { nnn: u16 },
    SkipIfEqual { x: u8, nn: u8 },
    SkipIfNotEqual { x: u8, nn: u8 },
    SkipIfRegistersEqual { x: u8, y: u8 },
    Load { x: u8, nn: u8 },
    Add { x: u8, nn: u8 },
    Move { x: u8, y: u8 },
    Or { x: u8, y: u8 },
    And { x: u8, y: u8 },
    Xor { x: u8, y: u8 },
    AddRegisters { x: u8, y: u8 },
    Sub { x: u8, y: u8 },
    ShiftRight { x: u8 },
    SubReversed { x: u8, y: u8 },
    ShiftLeft { x: u8 },
    SkipIfRegistersNotEqual { x: u8, y: u8 },
    LoadIndex { nnn: u16 },
    JumpOffset { nnn: u16 },
    Random { x: u8, nn: u8 },
    Draw { x: u8, y: u8, n: u8 },
    SkipIfKey { x: u8 },
    SkipIfNotKey { x: u8 },
    ReadDelay { x: u8 },
    WaitKey { x: u8 },
    SetDelay { x: u8 },
    SetSound { x: u8 },
    AddIndex { x: u8 },
    LoadGlyph { x: u8 },
    StoreDecimal { x: u8 },
    StoreRegisters { x: u8 },
    LoadRegisters { x: u8 },
}

impl Instruction {
    /// Decodes a 16-bit instruction word. Returns `None` when the word matches no known instruction.
    ///
    /// Decoding has no side effects, so an invalid word can be rejected before anything about the machine changes.
    ///
    /// # Example
    /// ```
    /// use chip8_vm::program::Instruction;
    /// assert_eq!(Instruction::decode(0x6A05), Some(Instruction::Load { x: 0xA, nn: 0x05 }));
    /// assert_eq!(Instruction::decode(0x5121), None);
    /// ```
    pub fn decode(word: u16) -> Option<Instruction> {
        use Instruction::*;
        let instruction = match nibbles(word) {
            [0x0, 0x0, 0xE, 0x0] => ClearScreen,
            [0x0, 0x0, 0xE, 0xE] => Return,
            [0x1, n1, n2, n3] => Jump { nnn: big_endian_4_3(n1, n2, n3) },
            [0x2, n1, n2, n3] => Call { nnn: big_endian_4_3(n1, n2, n3) },
            [0x3, x, n1, n2] => SkipIfEqual { x, nn: big_endian_4_2(n1, n2) },
            [0x4, x, n1, n2] => SkipIfNotEqual { x, nn: big_endian_4_2(n1, n2) },
            [0x5, x, y, 0x0] => SkipIfRegistersEqual { x, y },
            [0x6, x, n1, n2] => Load { x, nn: big_endian_4_2(n1, n2) },
            [0x7, x, n1, n2] => Add { x, nn: big_endian_4_2(n1, n2) },
            [0x8, x, y, 0x0] => Move { x, y },
            [0x8, x, y, 0x1] => Or { x, y },
            [0x8, x, y, 0x2] => And { x, y },
            [0x8, x, y, 0x3] => Xor { x, y },
            [0x8, x, y, 0x4] => AddRegisters { x, y },
            [0x8, x, y, 0x5] => Sub { x, y },
            [0x8, x, _, 0x6] => ShiftRight { x },
            [0x8, x, y, 0x7] => SubReversed { x, y },
            [0x8, x, _, 0xE] => ShiftLeft { x },
            [0x9, x, y, 0x0] => SkipIfRegistersNotEqual { x, y },
            [0xA, n1, n2, n3] => LoadIndex { nnn: big_endian_4_3(n1, n2, n3) },
            [0xB, n1, n2, n3] => JumpOffset { nnn: big_endian_4_3(n1, n2, n3) },
            [0xC, x, n1, n2] => Random { x, nn: big_endian_4_2(n1, n2) },
            [0xD, x, y, n] => Draw { x, y, n },
            [0xE, x, 0x9, 0xE] => SkipIfKey { x },
            [0xE, x, 0xA, 0x1] => SkipIfNotKey { x },
            [0xF, x, 0x0, 0x7] => ReadDelay { x },
            [0xF, x, 0x0, 0xA] => WaitKey { x },
            [0xF, x, 0x1, 0x5] => SetDelay { x },
            [0xF, x, 0x1, 0x8] => SetSound { x },
            [0xF, x, 0x1, 0xE] => AddIndex { x },
            [0xF, x, 0x2, 0x9] => LoadGlyph { x },
            [0xF, x, 0x3, 0x3] => StoreDecimal { x },
            [0xF, x, 0x5, 0x5] => StoreRegisters { x },
            [0xF, x, 0x6, 0x5] => LoadRegisters { x },
            _ => return None,
        };
        Some(instruction)
    }

    /// Executes the instruction on the mutable state of a `System`.
    ///
    /// `at` is the address the instruction was fetched from; the program counter has already moved past it.
    /// Every address is checked before anything is written, so a failing instruction changes nothing.
    pub fn execute<K>(self, sys: &mut system::System, keys: &mut K, at: u16) -> Result<(), Chip8Error>
    where
        K: KeySource + ?Sized,
    {
        use Instruction::*;
        let oob = |e: system::OutOfBounds| e.at(at);
        match self {
            ClearScreen => sys.framebuffer.clear(),
            Return => {
                sys.pc = sys.stack.pop().ok_or(Chip8Error::StackUnderflow { pc: at })?;
            }
            Jump { nnn } => sys.pc = nnn,
            Call { nnn } => {
                sys.stack.push(sys.pc);
                sys.pc = nnn;
            }
            SkipIfEqual { x, nn } => sys.skip_if(sys.registers.get(x) == nn),
            SkipIfNotEqual { x, nn } => sys.skip_if(sys.registers.get(x) != nn),
            SkipIfRegistersEqual { x, y } => sys.skip_if(sys.registers.get(x) == sys.registers.get(y)),
            Load { x, nn } => sys.registers.set(x, nn),
            Add { x, nn } => sys.registers.set(x, sys.registers.get(x).wrapping_add(nn)),
            Move { x, y } => sys.registers.set(x, sys.registers.get(y)),
            Or { x, y } => sys.registers.set(x, sys.registers.get(x) | sys.registers.get(y)),
            And { x, y } => sys.registers.set(x, sys.registers.get(x) & sys.registers.get(y)),
            Xor { x, y } => sys.registers.set(x, sys.registers.get(x) ^ sys.registers.get(y)),
            AddRegisters { x, y } => {
                let (sum, carry) = sys.registers.get(x).overflowing_add(sys.registers.get(y));
                sys.registers.set_vf(carry as u8);
                sys.registers.set(x, sum);
            }
            Sub { x, y } => {
                let (vx, vy) = (sys.registers.get(x), sys.registers.get(y));
                sys.registers.set_vf((vx > vy) as u8);
                sys.registers.set(x, vx.wrapping_sub(vy));
            }
            ShiftRight { x } => {
                let vx = sys.registers.get(x);
                sys.registers.set(x, vx >> 1);
                sys.registers.set_vf(vx & 0x01);
            }
            SubReversed { x, y } => {
                let (vx, vy) = (sys.registers.get(x), sys.registers.get(y));
                sys.registers.set_vf((vy > vx) as u8);
                sys.registers.set(x, vy.wrapping_sub(vx));
            }
            ShiftLeft { x } => {
                let vx = sys.registers.get(x);
                sys.registers.set(x, vx << 1);
                sys.registers.set_vf(vx >> 7);
            }
            SkipIfRegistersNotEqual { x, y } => sys.skip_if(sys.registers.get(x) != sys.registers.get(y)),
            LoadIndex { nnn } => sys.registers.set_i(nnn),
            JumpOffset { nnn } => sys.pc = nnn + sys.registers.get(0) as u16,
            Random { x, nn } => {
                let r: u8 = sys.rng.gen();
                sys.registers.set(x, r & nn);
            }
            Draw { x, y, n } => {
                let sprite = sys.memory.read(sys.registers.i() as usize, n as usize).map_err(oob)?;
                let collision = sys.framebuffer.draw_sprite(sys.registers.get(x), sys.registers.get(y), sprite);
                sys.registers.set_vf(collision as u8);
            }
            SkipIfKey { x } => {
                let vx = sys.registers.get(x);
                sys.skip_if(keys.pressed_key() == Some(vx));
            }
            SkipIfNotKey { x } => {
                let vx = sys.registers.get(x);
                sys.skip_if(keys.pressed_key() != Some(vx));
            }
            ReadDelay { x } => sys.registers.set(x, sys.timers.delay.get()),
            WaitKey { x } => match keys.pressed_key() {
                Some(key) => sys.registers.set(x, key),
                None => sys.pc = at,
            },
            SetDelay { x } => sys.timers.delay.set(sys.registers.get(x)),
            SetSound { x } => sys.timers.sound.set(sys.registers.get(x)),
            AddIndex { x } => {
                let sum = sys.registers.i() as u32 + sys.registers.get(x) as u32;
                // saturates so an index past the end never comes back into range
                sys.registers.set_i(u16::try_from(sum).unwrap_or(u16::MAX));
                // VF is left alone when there is no overflow
                if sum as usize >= system::MEMORY_SIZE {
                    sys.registers.set_vf(1);
                }
            }
            LoadGlyph { x } => {
                let glyph = (sys.registers.get(x) & 0x0F) as u16;
                sys.registers.set_i(FONT_ADDR + FONT_GLYPH_LEN * glyph);
            }
            StoreDecimal { x } => {
                let vx = sys.registers.get(x);
                let digits = [vx / 100, vx / 10 % 10, vx % 10];
                sys.memory.write(sys.registers.i() as usize, &digits).map_err(oob)?;
            }
            StoreRegisters { x } => {
                let values = &sys.registers.all()[..=x as usize];
                sys.memory.write(sys.registers.i() as usize, values).map_err(oob)?;
            }
            LoadRegisters { x } => {
                let values = sys.memory.read(sys.registers.i() as usize, x as usize + 1).map_err(oob)?;
                for (idx, value) in values.iter().enumerate() {
                    sys.registers.set(idx as u8, *value);
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Instruction {
    /// Formats the instruction as an assembly-style mnemonic, e.g. `LD V0, 0x05` or `DRW V1, V2, 5`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Instruction::*;
        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { nnn } => write!(f, "JP {:#05X}", nnn),
            Call { nnn } => write!(f, "CALL {:#05X}", nnn),
            SkipIfEqual { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            SkipIfNotEqual { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            SkipIfRegistersEqual { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Load { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Add { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddRegisters { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x } => write!(f, "SHR V{:X}", x),
            SubReversed { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            SkipIfRegistersNotEqual { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { nnn } => write!(f, "LD I, {:#05X}", nnn),
            JumpOffset { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            Random { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipIfKey { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotKey { x } => write!(f, "SKNP V{:X}", x),
            ReadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadGlyph { x } => write!(f, "LD F, V{:X}", x),
            StoreDecimal { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

/// Represents a program image as a list of bytes, copied verbatim to `PROGRAM_ADDR` when loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<u8>,
}

impl Program {
    pub fn from_bytes(bytes: &[u8]) -> Program {
        Program {
            instructions: bytes.to_vec(),
        }
    }

    /// Reads an image of unknown length from any reader.
    pub fn read(reader: &mut impl Read) -> io::Result<Program> {
        let mut instructions = Vec::new();
        reader.read_to_end(&mut instructions)?;
        Ok(Program { instructions })
    }

    /// Attempts to load a program from a given file path
    ///
    /// # Example
    /// ```no_run
    /// use chip8_vm::program::Program;
    /// let program = Program::load("rom.ch8")?;
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn load<P>(path: P) -> io::Result<Program>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path)?;
        Program::read(&mut file)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl std::fmt::Display for Program {
    /// Formats the `Program` as `<address>: <word>  <mnemonic>` lines, as the words would sit in memory once loaded.
    /// Words that do not decode are shown without a mnemonic; a trailing odd byte is shown on its own.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chunks = self.instructions.chunks_exact(2);
        let mut addr = PROGRAM_ADDR as usize;
        for pair in chunks.by_ref() {
            let word = big_endian_8_2(pair[0], pair[1]);
            match Instruction::decode(word) {
                Some(instruction) => writeln!(f, "{:03X}: {:04X}  {}", addr, word, instruction)?,
                None => writeln!(f, "{:03X}: {:04X}", addr, word)?,
            }
            addr += 2;
        }
        if let [last] = chunks.remainder() {
            writeln!(f, "{:03X}: {:02X}", addr, last)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_families() {
        assert_eq!(Instruction::decode(0x00E0), Some(Instruction::ClearScreen));
        assert_eq!(Instruction::decode(0x00EE), Some(Instruction::Return));
        assert_eq!(Instruction::decode(0x1ABC), Some(Instruction::Jump { nnn: 0xABC }));
        assert_eq!(Instruction::decode(0x2ABC), Some(Instruction::Call { nnn: 0xABC }));
        assert_eq!(Instruction::decode(0x8AB6), Some(Instruction::ShiftRight { x: 0xA }));
        assert_eq!(Instruction::decode(0x8ABE), Some(Instruction::ShiftLeft { x: 0xA }));
        assert_eq!(Instruction::decode(0xD125), Some(Instruction::Draw { x: 1, y: 2, n: 5 }));
        assert_eq!(Instruction::decode(0xE39E), Some(Instruction::SkipIfKey { x: 3 }));
        assert_eq!(Instruction::decode(0xF30A), Some(Instruction::WaitKey { x: 3 }));
        assert_eq!(Instruction::decode(0xF165), Some(Instruction::LoadRegisters { x: 1 }));
    }

    #[test]
    fn test_decode_rejects_unknown_words() {
        for word in [0x0000, 0x0123, 0x00E1, 0x5121, 0x8008, 0x800F, 0x9AB1, 0xE19F, 0xF000, 0xF1FF] {
            assert_eq!(Instruction::decode(word), None, "{:04X} should not decode", word);
        }
    }

    #[test]
    fn test_every_family_has_valid_words() {
        let decoded = (0..=0xFFFFu16)
            .filter_map(Instruction::decode)
            .map(|i| std::mem::discriminant(&i))
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(decoded.len(), 34);
    }

    #[test]
    fn test_mnemonics() {
        let text = |w| Instruction::decode(w).map(|i| i.to_string());
        assert_eq!(text(0x6005).as_deref(), Some("LD V0, 0x05"));
        assert_eq!(text(0xA22A).as_deref(), Some("LD I, 0x22A"));
        assert_eq!(text(0xD125).as_deref(), Some("DRW V1, V2, 5"));
        assert_eq!(text(0xFA55).as_deref(), Some("LD [I], VA"));
    }

    #[test]
    fn test_program_listing() {
        let program = Program::from_bytes(&[0xA2, 0x2A, 0x51, 0x21, 0x60]);
        assert_eq!(
            program.to_string(),
            "200: A22A  LD I, 0x22A\n202: 5121\n204: 60\n"
        );
    }

    #[test]
    fn test_program_read() -> Result<(), io::Error> {
        let mut src: &[u8] = &[0x00, 0xE0, 0x12, 0x00];
        let program = Program::read(&mut src)?;
        assert_eq!(program.len(), 4);
        assert_eq!(program.instructions, vec![0x00, 0xE0, 0x12, 0x00]);
        Ok(())
    }

    #[test]
    fn test_program_load_missing_file() {
        assert!(Program::load("definitely/not/here.ch8").is_err());
    }
}
