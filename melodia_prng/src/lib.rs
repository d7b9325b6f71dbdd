// Seedable pseudo-random source for melody generation.
//
// xoshiro256++ (Blackman & Vigna, 2019) with its state expanded from a single
// `u64` by SplitMix64. The generator is hand-written so that a given seed
// produces the same melody on every platform and toolchain; generation runs
// can be replayed exactly by reusing the seed printed by the CLI.
//
// The sampler in `melodia::sampling` only needs uniform floats in [0, 1),
// so the surface is small: raw `u64`s, unit-interval `f64`s, and a bounded
// integer draw for picking random items (e.g. synthetic test scores).
//
// The state is serde-serializable. A caller that wants to pause and resume a
// long generation can persist the generator next to the partial melody and
// continue the identical stream later.

use serde::{Deserialize, Serialize};

/// xoshiro256++ generator state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MelodyRng {
    state: [u64; 4],
}

impl MelodyRng {
    /// Seed a generator. Equal seeds yield equal streams.
    pub fn from_seed(seed: u64) -> Self {
        let mut sm = seed;
        let mut state = [0u64; 4];
        for word in &mut state {
            *word = splitmix64(&mut sm);
        }
        Self { state }
    }

    /// Next raw 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = self.state;
        let result = s0.wrapping_add(s3).rotate_left(23).wrapping_add(s0);

        let t = s1 << 17;
        let s2 = s2 ^ s0;
        let s3 = s3 ^ s1;
        let s1 = s1 ^ s2;
        let s0 = s0 ^ s3;

        self.state = [s0, s1, s2 ^ t, s3.rotate_left(45)];
        result
    }

    /// Uniform `f64` in [0, 1), built from the top 53 bits.
    pub fn next_unit_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[0, bound)` without modulo bias.
    ///
    /// Panics if `bound == 0`.
    pub fn below(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "below: bound must be positive");
        if bound.is_power_of_two() {
            return self.next_u64() & (bound - 1);
        }
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return r % bound;
            }
        }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
