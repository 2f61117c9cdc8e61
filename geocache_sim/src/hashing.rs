use std::hash::Hasher;

/// FNV-1a 64 keyed by the world seed.
///
/// The seed's little-endian bytes go in first, then whatever the cache field
/// writes for a cell, so the same world places the same caches on every
/// device and in every session.
#[derive(Debug, Clone)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn with_seed(seed: u64) -> Self {
        let mut hasher = Self {
            state: Self::OFFSET_BASIS,
        };
        hasher.write(&seed.to_le_bytes());
        hasher
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// SplitMix64 finaliser. FNV leaves the high bits poorly mixed for short keys.
#[inline]
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Well-mixed 64 bits for `key` in the world `seed`.
pub fn field_digest(seed: u64, key: &str) -> u64 {
    let mut hasher = FnvHasher::with_seed(seed);
    hasher.write(key.as_bytes());
    mix64(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_bytes_are_hashed_first() {
        assert_eq!(FnvHasher::with_seed(16).finish(), 0x987468c2d70edbd5);
    }

    #[test]
    fn digest_of_origin_cell() {
        assert_eq!(field_digest(16, "0,0"), 0x0406d9b9c77cf97c);
        assert_eq!(field_digest(17, "0,0"), 0x89aa7540ee2bb4a7);
    }

    #[test]
    fn mix64_of_zero_is_zero() {
        assert_eq!(mix64(0), 0);
        assert_ne!(mix64(1), 1);
    }
}
