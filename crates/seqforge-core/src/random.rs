//! # Seeded Random Source
//!
//! Every random draw of a generation call goes through one
//! [`DeterministicRandom`], in a fixed call order. Same seed, same draws.

use crate::config::ValidationConfig;

/// Per-call random source.
#[derive(Debug, Clone)]
pub struct DeterministicRandom {
    rng: fastrand::Rng,
    seed: u64,
}

impl DeterministicRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            seed,
        }
    }

    /// Seeded from process entropy. The drawn seed is still recorded.
    #[must_use]
    pub fn unpredictable() -> Self {
        Self::new(fastrand::Rng::new().u64(..))
    }

    /// Seed this source started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform pick; `None` for an empty slice.
    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.rng.usize(..items.len())])
    }
}

/// Seed derived from the request.
///
/// BLAKE3 over the seed text, the target length and the window/GC
/// fingerprint; the first eight bytes read little-endian.
#[must_use]
pub fn derive_seed(initial: &str, target_length: usize, config: &ValidationConfig) -> u64 {
    let material = format!("{initial}|{target_length}|{}", config.fingerprint());
    let hash = blake3::hash(material.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
