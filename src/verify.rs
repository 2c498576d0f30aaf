//! Log Verification
//!
//! Ties proofs, checkpoints and signatures together. The free functions take
//! the hasher and verifier explicitly; [`LogVerifier`] bundles them for
//! callers that check many entries against one log.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::checkpoint::{self, Checkpoint, SignedCheckpoint};
use crate::config::VerifierConfig;
use crate::crypto::SignatureVerifier;
use crate::entry::{self, ConsistencyProofResponse, LogEntry};
use crate::error::{Result, VerificationError};
use crate::merkle::{self, Hash, InclusionProof, LogHasher, Rfc6962Hasher};

/// Verify that `leaf_data` is the leaf the proof claims, under `trusted_root`.
pub fn verify_inclusion<H: LogHasher>(
    hasher: &H,
    leaf_data: &[u8],
    proof: &InclusionProof,
    trusted_root: &Hash,
) -> Result<()> {
    let leaf_hash = hasher.hash_leaf(leaf_data);
    merkle::verify_inclusion(
        hasher,
        proof.log_index,
        proof.tree_size,
        &leaf_hash,
        &proof.audit_path,
        trusted_root,
    )?;

    debug!(
        "Inclusion verified: index {} in tree of size {}",
        proof.log_index, proof.tree_size
    );
    Ok(())
}

/// Verify that `new` extends `old` without rewriting it.
///
/// Both checkpoints must already have passed their signature checks.
pub fn verify_consistency<H: LogHasher>(
    hasher: &H,
    old: &Checkpoint,
    new: &Checkpoint,
    hashes: &[Hash],
) -> Result<()> {
    if old.size > new.size {
        warn!(
            "Log {} shrank from {} to {} entries",
            new.origin, old.size, new.size
        );
        return Err(VerificationError::TreeShrunk {
            old_size: old.size,
            new_size: new.size,
        });
    }

    if old.size == new.size {
        if old.hash != new.hash {
            warn!(
                "Log {} presented two different roots at size {}",
                new.origin, new.size
            );
            return Err(VerificationError::root_hash_mismatch(
                old.size, &old.hash, &new.hash,
            ));
        }
        return Ok(());
    }

    merkle::verify_consistency(hasher, old.size, new.size, hashes, &old.hash, &new.hash)?;
    debug!(
        "Consistency verified: {} -> {} for {}",
        old.size, new.size, new.origin
    );
    Ok(())
}

/// [`verify_consistency`] over a consistency proof as returned by the log.
///
/// A root hash carried by the response must match `new`.
pub fn verify_consistency_proof<H: LogHasher>(
    hasher: &H,
    old: &Checkpoint,
    new: &Checkpoint,
    response: &ConsistencyProofResponse,
) -> Result<()> {
    if let Some(root_hash) = response.decoded_root_hash()? {
        if root_hash != new.hash {
            return Err(VerificationError::ConsistencyFailed(format!(
                "proof was served for root {}, checkpoint has {}",
                hex::encode(root_hash),
                hex::encode(new.hash)
            )));
        }
    }

    let proof = response.decode(old.size, new.size)?;
    verify_consistency(hasher, old, new, &proof.hashes)
}

/// Verify an entry's inclusion proof and then its signed entry timestamp.
///
/// The inclusion proof is checked against the root it carries, so this
/// shows the entry material is internally consistent. Anchoring that root
/// to a trusted checkpoint is up to the caller.
pub fn verify_log_entry<H: LogHasher>(
    hasher: &H,
    entry: &LogEntry,
    verifier: &dyn SignatureVerifier,
) -> Result<()> {
    let proof = entry
        .inclusion_proof()
        .ok_or(VerificationError::MissingInclusionProof)?
        .decode()?;

    verify_inclusion(hasher, &entry.body, &proof, &proof.root_hash)?;
    entry::verify_entry_timestamp(entry, verifier)?;

    info!(
        "Log entry verified: index {:?} in tree of size {}",
        entry.log_index, proof.tree_size
    );
    Ok(())
}

/// Check an old trusted checkpoint and a newly fetched one, then check that
/// the new one extends the old.
pub fn verify_current_checkpoint<H: LogHasher>(
    hasher: &H,
    old: &SignedCheckpoint,
    new: &SignedCheckpoint,
    hashes: &[Hash],
    verifier: &dyn SignatureVerifier,
) -> Result<()> {
    if old.origin() != new.origin() {
        return Err(VerificationError::OriginMismatch {
            expected: old.origin().to_string(),
            actual: new.origin().to_string(),
        });
    }

    if !old.verify(verifier)? {
        return Err(VerificationError::SignatureInvalid(
            "signature on old checkpoint did not verify".to_string(),
        ));
    }
    if !new.verify(verifier)? {
        return Err(VerificationError::SignatureInvalid(
            "signature on new checkpoint did not verify".to_string(),
        ));
    }

    verify_consistency(hasher, &old.checkpoint, &new.checkpoint, hashes)?;
    info!(
        "Checkpoint for {} advanced from {} to {}",
        new.origin(),
        old.size(),
        new.size()
    );
    Ok(())
}

/// Verifier bound to one log: its hashing scheme, its public key and
/// optionally its origin string.
#[derive(Clone)]
pub struct LogVerifier<H: LogHasher = Rfc6962Hasher> {
    hasher: H,
    verifier: Arc<dyn SignatureVerifier>,
    expected_origin: Option<String>,
}

impl LogVerifier<Rfc6962Hasher> {
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self::with_hasher(Rfc6962Hasher, verifier)
    }

    /// Build a verifier from loaded configuration.
    pub fn from_config(config: &VerifierConfig) -> Result<Self> {
        let verifier = Self::new(config.resolve_verifier()?);
        Ok(match &config.expected_origin {
            Some(origin) => verifier.with_expected_origin(origin.clone()),
            None => verifier,
        })
    }
}

impl<H: LogHasher> LogVerifier<H> {
    pub fn with_hasher(hasher: H, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            hasher,
            verifier,
            expected_origin: None,
        }
    }

    /// Reject checkpoints whose origin line differs from `origin`.
    pub fn with_expected_origin(mut self, origin: impl Into<String>) -> Self {
        self.expected_origin = Some(origin.into());
        self
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn expected_origin(&self) -> Option<&str> {
        self.expected_origin.as_deref()
    }

    fn check_origin(&self, checkpoint: &SignedCheckpoint) -> Result<()> {
        match &self.expected_origin {
            Some(expected) if expected != checkpoint.origin() => {
                Err(VerificationError::OriginMismatch {
                    expected: expected.clone(),
                    actual: checkpoint.origin().to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn verify_checkpoint_signature(&self, checkpoint: &SignedCheckpoint) -> Result<()> {
        self.check_origin(checkpoint)?;
        checkpoint::verify_checkpoint_signature(checkpoint, self.verifier.as_ref())
    }

    pub fn verify_inclusion(
        &self,
        leaf_data: &[u8],
        proof: &InclusionProof,
        trusted_root: &Hash,
    ) -> Result<()> {
        verify_inclusion(&self.hasher, leaf_data, proof, trusted_root)
    }

    pub fn verify_consistency(
        &self,
        old: &Checkpoint,
        new: &Checkpoint,
        hashes: &[Hash],
    ) -> Result<()> {
        verify_consistency(&self.hasher, old, new, hashes).map_err(log_fatal)
    }

    pub fn verify_consistency_proof(
        &self,
        old: &Checkpoint,
        new: &Checkpoint,
        response: &ConsistencyProofResponse,
    ) -> Result<()> {
        verify_consistency_proof(&self.hasher, old, new, response).map_err(log_fatal)
    }

    pub fn verify_entry_timestamp(&self, entry: &LogEntry) -> Result<()> {
        entry::verify_entry_timestamp(entry, self.verifier.as_ref())
    }

    pub fn verify_log_entry(&self, entry: &LogEntry) -> Result<()> {
        verify_log_entry(&self.hasher, entry, self.verifier.as_ref())
    }

    /// Verify the signed checkpoint a log attaches to an entry's inclusion
    /// proof and check that it commits to the same tree as the proof.
    pub fn verify_entry_checkpoint(&self, entry: &LogEntry) -> Result<SignedCheckpoint> {
        let response = entry
            .inclusion_proof()
            .ok_or(VerificationError::MissingInclusionProof)?;
        let checkpoint = response
            .signed_checkpoint()
            .ok_or(VerificationError::MissingField("checkpoint"))??;
        self.verify_checkpoint_signature(&checkpoint)?;

        let proof = response.decode()?;
        if checkpoint.size() != proof.tree_size {
            return Err(VerificationError::InvalidProof(format!(
                "checkpoint size {} does not match proof tree size {}",
                checkpoint.size(),
                proof.tree_size
            )));
        }
        if checkpoint.root_hash() != &proof.root_hash {
            return Err(VerificationError::root_mismatch(
                checkpoint.root_hash(),
                &proof.root_hash,
            ));
        }
        Ok(checkpoint)
    }

    pub fn verify_current_checkpoint(
        &self,
        old: &SignedCheckpoint,
        new: &SignedCheckpoint,
        hashes: &[Hash],
    ) -> Result<()> {
        self.check_origin(old)?;
        self.check_origin(new)?;
        verify_current_checkpoint(&self.hasher, old, new, hashes, self.verifier.as_ref())
            .map_err(log_fatal)
    }
}

fn log_fatal(err: VerificationError) -> VerificationError {
    if err.is_fatal() {
        warn!("Log misbehaviour detected: {}", err);
    }
    err
}
