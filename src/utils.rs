//! Free-standing helpers used by move generation and attack table builders.

#[inline(always)]
pub fn square_index(rank: usize, file: usize) -> usize {
    rank * 8 + file
}

/// Clears and returns the least significant set bit of `bb`.
#[inline(always)]
pub fn pop_lsb(bb: &mut u64) -> u8 {
    let idx = bb.trailing_zeros() as u8;
    *bb &= *bb - 1;
    idx
}
