//! RFC 6962 Merkle Hashing
//!
//! Leaf and interior node hashes are domain separated with a one byte
//! prefix so that a leaf can never be passed off as an interior node.

use sha2::{Digest, Sha256};

use super::Hash;

/// Leaf hash prefix.
pub const LEAF_HASH_PREFIX: u8 = 0x00;
/// Interior node hash prefix.
pub const NODE_HASH_PREFIX: u8 = 0x01;

/// Hashing scheme shared between a log and its clients.
///
/// Proof verification is generic over this trait so the scheme is always
/// chosen by the caller.
pub trait LogHasher: Send + Sync {
    /// Root of a tree with no leaves.
    fn empty_root(&self) -> Hash;

    /// Hash of a single leaf's raw content.
    fn hash_leaf(&self, data: &[u8]) -> Hash;

    /// Hash of an interior node from its two children.
    fn hash_children(&self, left: &Hash, right: &Hash) -> Hash;
}

/// SHA-256 hasher as used by Certificate Transparency and Rekor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rfc6962Hasher;

impl LogHasher for Rfc6962Hasher {
    fn empty_root(&self) -> Hash {
        Sha256::digest(b"").into()
    }

    fn hash_leaf(&self, data: &[u8]) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([LEAF_HASH_PREFIX]);
        hasher.update(data);
        hasher.finalize().into()
    }

    fn hash_children(&self, left: &Hash, right: &Hash) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([NODE_HASH_PREFIX]);
        hasher.update(left);
        hasher.update(right);
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root() {
        assert_eq!(
            hex::encode(Rfc6962Hasher.empty_root()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_empty_leaf() {
        assert_eq!(
            hex::encode(Rfc6962Hasher.hash_leaf(b"")),
            "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
        );
    }

    #[test]
    fn test_leaf_is_prefixed_sha256() {
        let data = b"L123456";
        let mut expected = Sha256::new();
        expected.update([0x00]);
        expected.update(data);
        let expected: Hash = expected.finalize().into();

        assert_eq!(Rfc6962Hasher.hash_leaf(data), expected);
        assert_ne!(Rfc6962Hasher.hash_leaf(data), <Hash>::from(Sha256::digest(data)));
    }

    #[test]
    fn test_children_order_matters() {
        let left = Rfc6962Hasher.hash_leaf(b"N123");
        let right = Rfc6962Hasher.hash_leaf(b"N456");

        let mut expected = Sha256::new();
        expected.update([0x01]);
        expected.update(left);
        expected.update(right);
        let expected: Hash = expected.finalize().into();

        assert_eq!(Rfc6962Hasher.hash_children(&left, &right), expected);
        assert_ne!(
            Rfc6962Hasher.hash_children(&left, &right),
            Rfc6962Hasher.hash_children(&right, &left)
        );
    }

    #[test]
    fn test_leaf_and_node_are_domain_separated() {
        let left = [0x11u8; 32];
        let right = [0x22u8; 32];
        let mut concatenated = Vec::new();
        concatenated.push(NODE_HASH_PREFIX);
        concatenated.extend_from_slice(&left);
        concatenated.extend_from_slice(&right);

        // A leaf whose content mimics a node preimage must not collide.
        assert_ne!(
            Rfc6962Hasher.hash_leaf(&concatenated[1..]),
            Rfc6962Hasher.hash_children(&left, &right)
        );
    }
}
