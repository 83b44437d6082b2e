//! # Hash Log — minimal persistence for the ordering core
//!
//! Persists only what the ordering core needs to survive a restart: the
//! two `initial_hashes` primers for the permutation oracle's sliding
//! window, and, optionally, this node's signing keypair. Block bodies,
//! transaction history, and account state are an external collaborator's
//! concern (see Non-goals) — this is not a general-purpose chain store.

use std::path::Path;

use sled::{Db, Tree};

use crate::crypto::keys::NovaKeypair;
use crate::ordering::types::BlockHash;

/// Well-known key in the `metadata` tree for the genesis/pre-genesis hashes.
const META_INITIAL_HASHES: &[u8] = b"initial_hashes";
/// Well-known key in the `metadata` tree for this node's signing key.
const META_SIGNING_KEY: &[u8] = b"signing_key";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Tiny sled-backed store for the hash window's startup primers and the
/// validator's signing key. Safe to share across threads via `Arc`, same
/// as any sled-backed store — trees support lock-free concurrent reads
/// and serialized writes.
#[derive(Debug, Clone)]
pub struct HashLogDb {
    db: Db,
    metadata: Tree,
}

impl HashLogDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary, in-memory database cleaned up on drop. Used by
    /// `node init --dev` and by tests — no filesystem side effects.
    pub fn open_temporary() -> StorageResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StorageResult<Self> {
        let metadata = db.open_tree("metadata")?;
        Ok(Self { db, metadata })
    }

    /// Persists the genesis/pre-genesis hash pair the permutation oracle's
    /// window is primed with.
    pub fn put_initial_hashes(&self, hashes: [BlockHash; 2]) -> StorageResult<()> {
        let bytes =
            bincode::serialize(&hashes).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.metadata.insert(META_INITIAL_HASHES, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Reads back the initial hash pair, if one was ever written.
    pub fn get_initial_hashes(&self) -> StorageResult<Option<[BlockHash; 2]>> {
        match self.metadata.get(META_INITIAL_HASHES)? {
            Some(bytes) => {
                let hashes = bincode::deserialize(&bytes)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(hashes))
            }
            None => Ok(None),
        }
    }

    /// Persists this node's signing key. Handle with the same care as the
    /// rest of `NovaKeypair` — never logged, never echoed back over RPC.
    pub fn put_signing_key(&self, keypair: &NovaKeypair) -> StorageResult<()> {
        self.metadata.insert(META_SIGNING_KEY, &keypair.to_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    /// Reads back the signing key, if one was ever written.
    pub fn get_signing_key(&self) -> StorageResult<Option<NovaKeypair>> {
        match self.metadata.get(META_SIGNING_KEY)? {
            Some(bytes) => {
                let arr: [u8; 32] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| StorageError::Serialization("signing key is not 32 bytes".into()))?;
                let keypair = NovaKeypair::from_bytes(&arr)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(keypair))
            }
            None => Ok(None),
        }
    }
}
