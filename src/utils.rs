//! Utility functions for assembling the numbers carried by instructions. Everything is _Big Endian_: the most
//! significant part comes first.

/// Splits a 16-bit instruction word into its four nibbles, most significant first.
///
/// # Examples
/// ```
/// use chip8_vm::utils::nibbles;
/// assert_eq!(nibbles(0xD01F), [0xD, 0x0, 0x1, 0xF]);
/// ```
pub fn nibbles(word: u16) -> [u8; 4] {
    [
        ((word & 0xF000) >> 12) as u8,
        ((word & 0x0F00) >> 8) as u8,
        ((word & 0x00F0) >> 4) as u8,
        (word & 0x000F) as u8,
    ]
}

/// Joins two nibbles into the 8-bit immediate `nn`.
///
/// Nibbles are passed as `u8`; only the low 4 bits of each are used.
///
/// # Examples
/// ```
/// use chip8_vm::utils::big_endian_4_2;
/// assert_eq!(big_endian_4_2(0xA, 0x8), 0xA8);
/// ```
pub fn big_endian_4_2(n1: u8, n2: u8) -> u8 {
    (n1 & 0xF) << 4 | (n2 & 0xF)
}

/// Joins three nibbles into the 12-bit address `nnn`. Rust has no `u12`, so the result is a `u16`.
///
/// # Examples
/// ```
/// use chip8_vm::utils::big_endian_4_3;
/// assert_eq!(big_endian_4_3(0xA, 0x2, 0x8), 0xA28);
/// ```
pub fn big_endian_4_3(n1: u8, n2: u8, n3: u8) -> u16 {
    (n1 as u16 & 0xF) << 8 | (n2 as u16 & 0xF) << 4 | (n3 as u16 & 0xF)
}

/// Joins two bytes into a 16-bit word, the first byte being the most significant.
///
/// # Examples
/// ```
/// use chip8_vm::utils::big_endian_8_2;
/// assert_eq!(big_endian_8_2(0xA4, 0x8E), 0xA48E);
/// ```
pub fn big_endian_8_2(n1: u8, n2: u8) -> u16 {
    u16::from_be_bytes([n1, n2])
}
