//! Deterministic helpers shared by featurization and tree building
//!
//! Seeded hashing for stable category assignment and tie-breaking
//! for split selection, so identical inputs always give identical models.

/// Seeded xxhash64-style hash over raw bytes
pub fn seeded_hash(data: &[u8], seed: u64) -> u64 {
    const PRIME1: u64 = 0x9E37_79B1_85EB_CA87;
    const PRIME2: u64 = 0xC2B2_AE3D_27D4_EB4F;
    const PRIME3: u64 = 0x1656_67B1_9E37_79F9;
    const PRIME5: u64 = 0x85EB_CA77_C2B2_AE63;

    let mut h = seed.wrapping_add(PRIME5).wrapping_add(data.len() as u64);

    for chunk in data.chunks(8) {
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        let val = u64::from_le_bytes(word);
        h = h.wrapping_add(val.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// Deterministic tie-breaker for split selection
/// Orders candidates by (feature_idx, bin, node_id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub bin: usize,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, bin: usize, node_id: usize) -> Self {
        Self {
            feature_idx,
            bin,
            node_id,
        }
    }
}
