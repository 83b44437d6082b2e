//! Persistent storage for the ordering core: just enough to survive a
//! restart (hash-window primers, signing key). See `hashlog` for details.

pub mod hashlog;

pub use hashlog::{HashLogDb, StorageError, StorageResult};
