//! Merkle Tree Proofs
//!
//! RFC 6962 hashing plus verification of inclusion and consistency proofs
//! against the append-only log tree.

pub mod hasher;
pub mod proof;

pub use hasher::{LogHasher, Rfc6962Hasher};
pub use proof::{
    decompose_inclusion_proof, root_from_inclusion_proof, verify_consistency, verify_inclusion,
};

use crate::error::{Result, VerificationError};

/// Size in bytes of every tree hash.
pub const HASH_SIZE: usize = 32;

/// A SHA-256 tree hash.
pub type Hash = [u8; HASH_SIZE];

/// Decode a hex encoded tree hash, rejecting anything that is not exactly
/// [`HASH_SIZE`] bytes.
pub fn decode_hash(encoded: &str) -> Result<Hash> {
    let bytes = hex::decode(encoded)?;
    Hash::try_from(bytes.as_slice()).map_err(|_| {
        VerificationError::EncodingError(format!(
            "expected {} byte hash, got {} bytes",
            HASH_SIZE,
            bytes.len()
        ))
    })
}

/// Decode an ordered list of hex encoded hashes.
pub fn decode_hashes<S: AsRef<str>>(encoded: &[S]) -> Result<Vec<Hash>> {
    encoded
        .iter()
        .enumerate()
        .map(|(i, h)| {
            decode_hash(h.as_ref()).map_err(|e| {
                VerificationError::EncodingError(format!("proof hash {}: {}", i, e))
            })
        })
        .collect()
}

/// Proof that the leaf at `log_index` is part of the tree of `tree_size`
/// leaves whose root is `root_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    pub log_index: u64,
    pub tree_size: u64,
    pub audit_path: Vec<Hash>,
    pub root_hash: Hash,
}

impl InclusionProof {
    /// Check that `leaf_hash` resolves to this proof's own root hash.
    pub fn verify<H: LogHasher>(&self, hasher: &H, leaf_hash: &Hash) -> Result<()> {
        verify_inclusion(
            hasher,
            self.log_index,
            self.tree_size,
            leaf_hash,
            &self.audit_path,
            &self.root_hash,
        )
    }
}

/// Proof that the tree of `first_size` leaves is a prefix of the tree of
/// `last_size` leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyProof {
    pub first_size: u64,
    pub last_size: u64,
    pub hashes: Vec<Hash>,
}

impl ConsistencyProof {
    pub fn verify<H: LogHasher>(&self, hasher: &H, first_root: &Hash, last_root: &Hash) -> Result<()> {
        verify_consistency(
            hasher,
            self.first_size,
            self.last_size,
            &self.hashes,
            first_root,
            last_root,
        )
    }
}
