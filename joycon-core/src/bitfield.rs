//! Bit-field access into report bytes
//!
//! Every field of a Joy-Con input report lives inside a single byte, so the
//! codec only ever deals with `n_bits <= 8` windows.

/// Extract an `n_bits` wide unsigned field starting at `bit_offset` of
/// `buffer[byte_offset]`
///
/// Caller guarantees `byte_offset < buffer.len()` and
/// `bit_offset + n_bits <= 8`.
///
/// # Examples
///
/// ```
/// use joycon_core::bitfield;
///
/// // battery level lives in the upper three bits
/// assert_eq!(bitfield::extract(&[0b1001_0000], 0, 5, 3), 0b100);
/// ```
#[inline]
pub fn extract(buffer: &[u8], byte_offset: usize, bit_offset: u8, n_bits: u8) -> u8 {
    debug_assert!(bit_offset + n_bits <= 8);
    (buffer[byte_offset] >> bit_offset) & mask(n_bits)
}

/// Write `value` into an `n_bits` wide field, leaving other bits untouched
///
/// Bits of `value` above `n_bits` are discarded.
#[inline]
pub fn insert(buffer: &mut [u8], byte_offset: usize, bit_offset: u8, n_bits: u8, value: u8) {
    debug_assert!(bit_offset + n_bits <= 8);
    let m = mask(n_bits) << bit_offset;
    buffer[byte_offset] = (buffer[byte_offset] & !m) | ((value << bit_offset) & m);
}

/// Single-bit flag
#[inline]
pub fn flag(buffer: &[u8], byte_offset: usize, bit_offset: u8) -> bool {
    extract(buffer, byte_offset, bit_offset, 1) != 0
}

#[inline]
fn mask(n_bits: u8) -> u8 {
    ((1u16 << n_bits) - 1) as u8
}
