//! # Permutation Oracle
//!
//! Derives a deterministic permutation of `[0, n)` from a block hash. Every
//! honest node must produce byte-identical output for identical input —
//! this is consensus-critical, so the PRNG is a named, version-pinned
//! algorithm (ChaCha20) rather than whatever `rand`'s default happens to be
//! this release (`StdRng` makes no such stability guarantee).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::types::BlockHash;

/// Produces deterministic permutations of `[0, n)` seeded by block hashes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermutationOracle;

impl PermutationOracle {
    pub fn new() -> Self {
        Self
    }

    /// Fisher–Yates shuffle of `[0, n)`, seeded directly from `hash`'s bytes.
    ///
    /// Returns an empty vector for `n == 0`.
    pub fn permute(&self, hash: &BlockHash, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        if n < 2 {
            return indices;
        }

        let mut rng = ChaCha20Rng::from_seed(*hash.as_bytes());
        for i in (1..n).rev() {
            let j = rng.gen_range(0..=i);
            indices.swap(i, j);
        }
        indices
    }

    /// Derives the three permutations (`CurrentRound`, `NextRound`,
    /// `RoundAfterNext`) used by the Connection Manager, one per hash in
    /// `hashes`, over a peer set of size `n`.
    pub fn permute_window(&self, hashes: [&BlockHash; 3], n: usize) -> [Vec<usize>; 3] {
        [
            self.permute(hashes[0], n),
            self.permute(hashes[1], n),
            self.permute(hashes[2], n),
        ]
    }
}
