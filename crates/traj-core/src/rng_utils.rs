//! Small deterministic generator shared by seeded sampling code.
//!
//! The sequence depends only on the seed, so a sieve drawn with the same seed
//! selects the same frames on every platform and crate version.

const ZERO_SEED_STATE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Turn a user seed into a generator state. Zero is remapped so that the
/// first draws are not degenerate.
pub fn seeded_state(seed: u64) -> u64 {
    if seed == 0 {
        ZERO_SEED_STATE
    } else {
        seed
    }
}

pub fn next_u64(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005u64).wrapping_add(1);
    *state
}

/// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
pub fn next_below(state: &mut u64, bound: usize) -> usize {
    if bound == 0 {
        return 0;
    }
    // high bits of an LCG are the well-mixed ones
    let value = next_u64(state) >> 16;
    (value % bound as u64) as usize
}
