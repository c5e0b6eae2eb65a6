/// Unsigned LEB128 helpers for compact length/index operands.
///
/// Values are written 7 bits at a time, least significant group first; the high bit of each
/// byte marks a continuation. Readers advance a cursor and never read past the slice.

/// Longest valid encoding of a `u64` (10 groups of 7 bits).
pub const MAX_U64_LEN: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarintError {
    /// The slice ended inside a value.
    Truncated,
    /// The encoding does not fit in a `u64`.
    Overflow,
}

/// Append `value` to `out`.
pub fn write_u64(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Append a `usize` as unsigned LEB128.
#[inline]
pub fn write_usize(out: &mut Vec<u8>, value: usize) {
    write_u64(out, value as u64);
}

/// Number of bytes `write_u64` would emit for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Read one value starting at `*pos`, advancing `*pos` past it.
///
/// On error `*pos` is left untouched.
pub fn read_u64(bytes: &[u8], pos: &mut usize) -> Result<u64, VarintError> {
    let mut result = 0u64;
    let mut cursor = *pos;
    for i in 0..MAX_U64_LEN {
        let Some(&byte) = bytes.get(cursor) else {
            return Err(VarintError::Truncated);
        };
        cursor += 1;
        let group = u64::from(byte & 0x7F);
        // 10th group may only carry the single remaining bit.
        if i == MAX_U64_LEN - 1 && group > 1 {
            return Err(VarintError::Overflow);
        }
        result |= group << (7 * i);
        if byte & 0x80 == 0 {
            *pos = cursor;
            return Ok(result);
        }
    }
    Err(VarintError::Overflow)
}

/// Read a value that must fit in `usize`.
pub fn read_usize(bytes: &[u8], pos: &mut usize) -> Result<usize, VarintError> {
    let start = *pos;
    let value = read_u64(bytes, pos)?;
    usize::try_from(value).map_err(|_| {
        *pos = start;
        VarintError::Overflow
    })
}
