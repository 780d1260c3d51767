//! The error type shared by every fallible operation of the virtual machine.

use thiserror::Error;

/// Fatal conditions raised while loading or running a program.
///
/// None of these are recoverable from inside the machine: the step loop halts and the host decides what to do.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("invalid instruction {opcode:#06X} at {pc:#05X}")]
    InvalidInstruction { opcode: u16, pc: u16 },

    #[error("stack underflow: return at {pc:#05X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("address {address:#06X} out of bounds (instruction at {pc:#05X})")]
    AddressOutOfBounds { address: usize, pc: u16 },

    #[error("program of {len} bytes does not fit in {capacity} bytes of program memory")]
    ProgramTooLarge { len: usize, capacity: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let e = Chip8Error::InvalidInstruction { opcode: 0x5121, pc: 0x204 };
        assert_eq!(e.to_string(), "invalid instruction 0x5121 at 0x204");

        let e = Chip8Error::AddressOutOfBounds { address: 0x1000, pc: 0x200 };
        assert_eq!(e.to_string(), "address 0x1000 out of bounds (instruction at 0x200)");
    }
}
