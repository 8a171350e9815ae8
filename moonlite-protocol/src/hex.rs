//! Hexadecimal codec for Moonlite payloads.
//!
//! Positions travel as 4 uppercase hex digits, bytes as 2. Decoding is
//! permissive: lowercase is accepted and any non-hex character contributes
//! zero bits for its nibble. The parser validates the charset before a
//! payload ever reaches these functions.

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Check whether a byte is a hex digit (`0-9`, `A-F`, `a-f`)
pub fn is_hex_digit(byte: u8) -> bool {
    byte.is_ascii_hexdigit()
}

/// Value of a single hex digit, or 0 for anything else
fn nibble(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'A'..=b'F' => byte - b'A' + 10,
        b'a'..=b'f' => byte - b'a' + 10,
        _ => 0,
    }
}

/// Encode a byte as 2 uppercase hex characters
pub fn encode_byte(value: u8) -> [u8; 2] {
    [DIGITS[(value >> 4) as usize], DIGITS[(value & 0x0F) as usize]]
}

/// Encode a word as 4 uppercase hex characters
pub fn encode_word(value: u16) -> [u8; 4] {
    let [hi, lo] = value.to_be_bytes();
    let [a, b] = encode_byte(hi);
    let [c, d] = encode_byte(lo);
    [a, b, c, d]
}

/// Decode hex characters into a value, keeping the bits in `mask`
fn decode(chars: &[u8], mask: u32) -> u32 {
    chars
        .iter()
        .fold(0u32, |acc, &c| ((acc << 4) | nibble(c) as u32) & mask)
}

/// Decode up to 2 hex characters into a byte
pub fn decode_byte(chars: &[u8]) -> u8 {
    decode(chars, 0xFF) as u8
}

/// Decode up to 4 hex characters into a word
pub fn decode_word(chars: &[u8]) -> u16 {
    decode(chars, 0xFFFF) as u16
}
