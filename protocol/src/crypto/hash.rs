//! # Hashing Utilities
//!
//! BLAKE3 hashing used by the ordering/YAC core. The permutation oracle
//! only needs the hash's bytes to be uniformly distributed enough to seed
//! a PRNG — it never inspects them any other way.

/// Compute the BLAKE3 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. Uses the `blake3`
/// crate, which takes advantage of SIMD instructions on supported
/// platforms.
///
/// # Example
///
/// ```
/// use nova_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"NOVA protocol");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute BLAKE3 and return the digest as a `Vec<u8>`.
///
/// Use [`blake3_hash`] when you want a fixed-size array. This variant
/// exists for call sites that need owned data (e.g. storing hashes in a
/// `HashMap<Vec<u8>, _>`).
pub fn blake3_hash_vec(data: &[u8]) -> Vec<u8> {
    blake3::hash(data).as_bytes().to_vec()
}

/// Compute a domain-separated hash using BLAKE3 with a context string.
///
/// Domain separation prevents hash collisions across different protocol
/// contexts, e.g. `domain_separated_hash("proposal", data)` and
/// `domain_separated_hash("vote", data)` never collide even for identical
/// `data`. Uses BLAKE3's `derive_key` mode.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Feeds each part sequentially into the hasher rather than allocating a
/// buffer to concatenate them first.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
