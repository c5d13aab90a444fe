#![forbid(unsafe_code)]
//! Big-endian integer helpers shared by the header and node codecs.

const U64_LEN: usize = core::mem::size_of::<u64>();

/// Writes `v` big-endian into the 8-byte slot starting at `off`.
///
/// Panics if `dst` is shorter than `off + 8`; callers size their buffers
/// from fixed layout constants.
pub fn put_u64_be(dst: &mut [u8], off: usize, v: u64) {
    dst[off..off + U64_LEN].copy_from_slice(&v.to_be_bytes());
}

/// Reads a big-endian u64 from the 8-byte slot starting at `off`.
pub fn get_u64_be(src: &[u8], off: usize) -> u64 {
    let mut bytes = [0u8; U64_LEN];
    bytes.copy_from_slice(&src[off..off + U64_LEN]);
    u64::from_be_bytes(bytes)
}

/// Writes each value of `values` into consecutive 8-byte slots from `off`.
pub fn put_u64_array(dst: &mut [u8], off: usize, values: &[u64]) {
    for (idx, value) in values.iter().enumerate() {
        put_u64_be(dst, off + idx * U64_LEN, *value);
    }
}

/// Fills `out` from consecutive 8-byte slots starting at `off`.
pub fn get_u64_array(src: &[u8], off: usize, out: &mut [u64]) {
    for (idx, slot) in out.iter_mut().enumerate() {
        *slot = get_u64_be(src, off + idx * U64_LEN);
    }
}
