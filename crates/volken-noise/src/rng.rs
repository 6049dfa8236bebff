//! Deterministic integer randomness for the noise generators.
//!
//! `noise_hash` is a stateless lattice hash; `SeededSequence` is a small PCG
//! stream for placing feature points and gradients. Both are pure integer
//! arithmetic so output is identical on every platform.

/// Hash a lattice coordinate and seed into a well-mixed u32.
pub fn noise_hash(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut state = (x as u32)
        .wrapping_mul(0x9E37_79B9)
        .wrapping_add((y as u32).wrapping_mul(0x517C_C1B7))
        .wrapping_add((z as u32).wrapping_mul(0x6C62_272E))
        .wrapping_add(seed.wrapping_mul(0x2545_F491));

    state ^= state >> 16;
    state = state.wrapping_mul(0x045D_9F3B);
    state ^= state >> 16;
    state = state.wrapping_mul(0x045D_9F3B);
    state ^= state >> 16;

    state
}

/// Map a hash to [0, 1) using its top 24 bits.
pub fn hash_to_unit(hash: u32) -> f32 {
    (hash >> 8) as f32 / 16_777_216.0 // 2^24
}

const PCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const PCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// PCG-XSH-RR stream. Restarting from the same seed replays the same values.
#[derive(Debug, Clone)]
pub struct SeededSequence {
    state: u64,
}

impl SeededSequence {
    pub fn new(seed: u32) -> Self {
        let mut seq = Self { state: 0 };
        seq.next_u32();
        seq.state = seq.state.wrapping_add(u64::from(seed));
        seq.next_u32();
        seq
    }

    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.state = old.wrapping_mul(PCG_MULTIPLIER).wrapping_add(PCG_INCREMENT);
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Next value in [0, 1).
    pub fn next_unit(&mut self) -> f32 {
        hash_to_unit(self.next_u32())
    }
}
