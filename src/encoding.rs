//! Manchester encoding and decoding for 1-wire OSP telegrams.
//!
//! In MCU mode type A the first node of the chain receives commands over a single wire, with
//! the clock embedded in the data. Every bit is sent as a pair of symbols following IEEE 802.4:
//!
//! - bit `1` → `01` (rising edge in the middle of the bit)
//! - bit `0` → `10` (falling edge in the middle of the bit)
//!
//! A telegram byte thus becomes a 16-bit word, sent big-endian (MSB first), which doubles the
//! telegram size and the SPI clock needed to send it in time.
//!
//! ## Symbol Table
//!
//! The encoder maps each byte through a 256-entry table computed at compile time. The decoder
//! walks the symbol pairs and rejects words that contain `00` or `11` pairs, which can not
//! occur in a valid Manchester stream.
//!
//! ## Functions
//!
//! - [`encode`]: Converts a single byte into a 16-bit Manchester word
//! - [`decode`]: Recovers a byte from a 16-bit Manchester word
//! - [`encode_buffer`]: Encodes a byte slice into a (twice as long) symbol slice
//! - [`decode_buffer`]: Decodes a symbol slice back into the original bytes

const fn manchester(byte: u8) -> u16 {
    let mut word: u16 = 0;
    let mut bit = 8;
    while bit > 0 {
        bit -= 1;
        word <<= 2;
        word |= if byte & (1 << bit) != 0 { 0b01 } else { 0b10 };
    }
    word
}

const fn manchester_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = manchester(i as u8);
        i += 1;
    }
    table
}

static SYMBOLS: [u16; 256] = manchester_table();

/// Encodes an 8-bit byte into a 16-bit Manchester word.
pub fn encode(byte: u8) -> u16 {
    SYMBOLS[usize::from(byte)]
}

/// Decodes a 16-bit Manchester word back into the original byte.
///
/// Returns `None` if any symbol pair is `00` or `11`.
pub fn decode(word: u16) -> Option<u8> {
    let mut byte: u8 = 0;
    for pair in (0..8).rev() {
        byte <<= 1;
        match (word >> (2 * pair)) & 0b11 {
            0b01 => byte |= 1,
            0b10 => {}
            _ => return None,
        }
    }
    Some(byte)
}

/// Encodes `input` into `output` as big-endian Manchester words.
///
/// # Arguments
/// - `&[u8]` : The input buffer slice
/// - `&mut [u8]` : The output buffer, which should be twice as long as the input
///
/// # Returns
/// The length of the encoded data. Encoding stops early when `output` is full.
pub fn encode_buffer(input: &[u8], output: &mut [u8]) -> usize {
    let mut i = 0;
    for (&byte, out) in input.iter().zip(output.chunks_exact_mut(2)) {
        out.copy_from_slice(&encode(byte).to_be_bytes());
        i += 2;
    }
    i
}

/// Decodes big-endian Manchester words from `input` into `output`.
///
/// # Returns
/// The optional length of the output buffer.
/// Returns `None` if the input has an odd length or contains an invalid symbol pair.
pub fn decode_buffer(input: &[u8], output: &mut [u8]) -> Option<usize> {
    if input.len() % 2 != 0 {
        return None;
    }
    let mut i = 0;
    for (chunk, out) in input.chunks_exact(2).zip(output.iter_mut()) {
        *out = decode(u16::from_be_bytes([chunk[0], chunk[1]]))?;
        i += 1;
    }
    Some(i)
}
