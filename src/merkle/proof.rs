//! Inclusion and Consistency Proof Verification
//!
//! Proofs are verified by splitting the audit path into an "inner" part,
//! where the sibling side is given by the bits of the leaf index, and a
//! "border" part, where every sibling is a left sibling on the right edge
//! of the tree. This handles trees whose size is not a power of two.

use tracing::debug;

use super::hasher::LogHasher;
use super::Hash;
use crate::error::{Result, VerificationError};

/// Split the audit path for leaf `index` in a tree of `size` leaves into
/// its inner and border lengths. Only meaningful for `index < size`; the
/// empty tree has no audit paths and yields `(0, 0)`.
pub fn decompose_inclusion_proof(index: u64, size: u64) -> (usize, usize) {
    if size == 0 {
        return (0, 0);
    }
    let inner = inner_proof_size(index, size);
    let border = index.checked_shr(inner as u32).unwrap_or(0).count_ones() as usize;
    (inner, border)
}

/// Number of levels below the point where the path to `index` and the path
/// to the last leaf diverge.
fn inner_proof_size(index: u64, size: u64) -> usize {
    (u64::BITS - (index ^ (size - 1)).leading_zeros()) as usize
}

/// Verify that `leaf_hash` is the leaf at `index` of the tree of `size`
/// leaves with root `root`.
pub fn verify_inclusion<H: LogHasher>(
    hasher: &H,
    index: u64,
    size: u64,
    leaf_hash: &Hash,
    proof: &[Hash],
    root: &Hash,
) -> Result<()> {
    let calculated = root_from_inclusion_proof(hasher, index, size, leaf_hash, proof)?;
    if &calculated != root {
        debug!(index, size, "inclusion proof resolved to a different root");
        return Err(VerificationError::root_mismatch(root, &calculated));
    }
    Ok(())
}

/// Recompute the tree root implied by an inclusion proof.
pub fn root_from_inclusion_proof<H: LogHasher>(
    hasher: &H,
    index: u64,
    size: u64,
    leaf_hash: &Hash,
    proof: &[Hash],
) -> Result<Hash> {
    if index >= size {
        return Err(VerificationError::InvalidProof(format!(
            "index {} is beyond tree size {}",
            index, size
        )));
    }

    let (inner, border) = decompose_inclusion_proof(index, size);
    if proof.len() != inner + border {
        return Err(VerificationError::InvalidProof(format!(
            "wrong proof size {}, want {}",
            proof.len(),
            inner + border
        )));
    }

    let res = chain_inner(hasher, *leaf_hash, &proof[..inner], index);
    Ok(chain_border_right(hasher, res, &proof[inner..]))
}

/// Verify that the tree of `size1` leaves with root `root1` is a prefix of
/// the tree of `size2` leaves with root `root2`.
pub fn verify_consistency<H: LogHasher>(
    hasher: &H,
    size1: u64,
    size2: u64,
    proof: &[Hash],
    root1: &Hash,
    root2: &Hash,
) -> Result<()> {
    if size2 < size1 {
        return Err(VerificationError::TreeShrunk {
            old_size: size1,
            new_size: size2,
        });
    }
    if size1 == size2 {
        if !proof.is_empty() {
            return Err(VerificationError::InvalidProof(
                "sizes are equal but proof is not empty".to_string(),
            ));
        }
        if root1 != root2 {
            return Err(VerificationError::root_hash_mismatch(size1, root1, root2));
        }
        return Ok(());
    }
    if size1 == 0 {
        // Every tree extends the empty tree, as long as it really is empty.
        if !proof.is_empty() {
            return Err(VerificationError::InvalidProof(format!(
                "expected empty proof, got {} hashes",
                proof.len()
            )));
        }
        if root1 != &hasher.empty_root() {
            return Err(VerificationError::ConsistencyFailed(
                "tree of size 0 does not have the empty root".to_string(),
            ));
        }
        return Ok(());
    }
    if proof.is_empty() {
        return Err(VerificationError::InvalidProof("empty proof".to_string()));
    }

    let (inner, border) = decompose_inclusion_proof(size1 - 1, size2);
    let shift = size1.trailing_zeros() as usize;
    // shift < inner whenever size1 < size2
    let inner = inner - shift;

    // The proof starts with the root of the subtree of size 2^shift, unless
    // size1 is exactly that subtree.
    let (seed, start) = if size1 == 1u64 << shift {
        (*root1, 0)
    } else {
        (proof[0], 1)
    };
    if proof.len() != start + inner + border {
        return Err(VerificationError::InvalidProof(format!(
            "wrong proof size {}, want {}",
            proof.len(),
            start + inner + border
        )));
    }
    let proof = &proof[start..];

    let mask = (size1 - 1) >> shift;

    let hash1 = chain_inner_right(hasher, seed, &proof[..inner], mask);
    let hash1 = chain_border_right(hasher, hash1, &proof[inner..]);
    if &hash1 != root1 {
        return Err(VerificationError::ConsistencyFailed(format!(
            "proof does not reproduce old root: calculated {}, expected {}",
            hex::encode(hash1),
            hex::encode(root1)
        )));
    }

    let hash2 = chain_inner(hasher, seed, &proof[..inner], mask);
    let hash2 = chain_border_right(hasher, hash2, &proof[inner..]);
    if &hash2 != root2 {
        return Err(VerificationError::ConsistencyFailed(format!(
            "proof does not reproduce new root: calculated {}, expected {}",
            hex::encode(hash2),
            hex::encode(root2)
        )));
    }

    debug!(size1, size2, "consistency proof verified");
    Ok(())
}

/// Hash `seed` up the inner levels, placing it left or right according to
/// the bits of `index`.
fn chain_inner<H: LogHasher>(hasher: &H, mut seed: Hash, proof: &[Hash], index: u64) -> Hash {
    for (i, h) in proof.iter().enumerate() {
        if (index >> i) & 1 == 0 {
            seed = hasher.hash_children(&seed, h);
        } else {
            seed = hasher.hash_children(h, &seed);
        }
    }
    seed
}

/// Like [`chain_inner`], but only folds in left siblings. Reproduces the
/// root of the smaller tree in a consistency proof.
fn chain_inner_right<H: LogHasher>(hasher: &H, mut seed: Hash, proof: &[Hash], index: u64) -> Hash {
    for (i, h) in proof.iter().enumerate() {
        if (index >> i) & 1 == 1 {
            seed = hasher.hash_children(h, &seed);
        }
    }
    seed
}

fn chain_border_right<H: LogHasher>(hasher: &H, mut seed: Hash, proof: &[Hash]) -> Hash {
    for h in proof {
        seed = hasher.hash_children(h, &seed);
    }
    seed
}
