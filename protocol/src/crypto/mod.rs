//! # Cryptographic Primitives
//!
//! The ordering/YAC core only needs two things from cryptography: BLAKE3
//! hashing (to seed the permutation oracle and identify proposals) and
//! Ed25519 signing (to authenticate votes and peer identities). Everything
//! here is a thin, type-safe wrapper around audited implementations.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, blake3_hash_multi, blake3_hash_vec, domain_separated_hash};
pub use keys::{NovaKeypair, NovaPublicKey, NovaSignature};
