//! Bit-sequence helpers.
//!
//! Profiles address fields by bit offset from the most significant bit of
//! the payload, so payloads are handled as `Vec<bool>` with index 0 being the
//! MSB of the first byte.

/// Combine bytes big-endian into an integer, keeping the low 64 bits.
pub fn combine(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

/// Expand bytes into bits, MSB first, zero-padded on the left to `width`.
///
/// When the significant bits of `bytes` need more than `width` positions
/// they are all kept; leading zero bits beyond `width` are not.
pub fn bytes_to_bits(bytes: &[u8], width: usize) -> Vec<bool> {
    let full: Vec<bool> = bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |bit| byte & (1 << bit) != 0))
        .collect();

    let significant = full
        .iter()
        .position(|&bit| bit)
        .map_or(0, |first| full.len() - first);
    let len = width.max(significant);

    if len <= full.len() {
        full[full.len() - len..].to_vec()
    } else {
        let mut bits = vec![false; len - full.len()];
        bits.extend(full);
        bits
    }
}

/// Read bits as an unsigned integer, MSB first. Empty input is 0.
///
/// Sequences longer than 64 bits keep their low 64 bits.
pub fn bits_to_integer(bits: &[bool]) -> u64 {
    let tail = &bits[bits.len().saturating_sub(64)..];
    tail.iter().fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit))
}

/// Render `value` as exactly `width` bits, MSB first. Higher bits are dropped.
pub fn integer_to_bits(value: u64, width: usize) -> Vec<bool> {
    (0..width)
        .rev()
        .map(|bit| bit < 64 && value & (1u64 << bit) != 0)
        .collect()
}

/// Pack bits into bytes, MSB first. A trailing partial byte is zero-filled
/// on the right.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
        })
        .collect()
}

/// Read `width` bits starting at `offset`, or `None` if the range falls
/// outside `bits`.
pub fn read_bits(bits: &[bool], offset: usize, width: usize) -> Option<u64> {
    let end = offset.checked_add(width)?;
    bits.get(offset..end).map(bits_to_integer)
}

/// Overwrite `width` bits at `offset` with `value`.
///
/// Returns `false` (and leaves `bits` untouched) if the range falls outside
/// `bits`.
pub fn write_bits(bits: &mut [bool], offset: usize, width: usize, value: u64) -> bool {
    let Some(end) = offset.checked_add(width) else {
        return false;
    };
    match bits.get_mut(offset..end) {
        Some(target) => {
            target.copy_from_slice(&integer_to_bits(value, width));
            true
        }
        None => false,
    }
}
