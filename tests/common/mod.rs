#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::Signer as _;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use tlog_verifier::checkpoint::{parse_checkpoint, Checkpoint, SignedCheckpoint};
use tlog_verifier::crypto::{Ed25519Verifier, P256Verifier, Secp256k1Verifier, SignatureVerifier};
use tlog_verifier::entry::{entry_timestamp_payload, EntryVerification, InclusionProofResponse, LogEntry};
use tlog_verifier::merkle::{Hash, LogHasher, Rfc6962Hasher};

pub const ORIGIN: &str = "rekor.example.dev - 2605736670972794746";
pub const LOG_ID: &str = "c0d23d6ad406973f9559f3ba2d1ca01f84147d8ffc5b8445c224f98b9591801d";

/// Reference log built the slow way, straight from the RFC 6962 definitions.
pub struct TestLog {
    pub entries: Vec<Vec<u8>>,
    pub leaves: Vec<Hash>,
}

impl TestLog {
    pub fn new(size: usize) -> Self {
        let entries: Vec<Vec<u8>> = (0..size)
            .map(|i| json!({"kind": "test", "index": i}).to_string().into_bytes())
            .collect();
        let leaves = entries.iter().map(|e| Rfc6962Hasher.hash_leaf(e)).collect();
        Self { entries, leaves }
    }

    pub fn size(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn root(&self, size: usize) -> Hash {
        mth(&self.leaves[..size])
    }

    pub fn inclusion_path(&self, index: usize, size: usize) -> Vec<Hash> {
        path(index, &self.leaves[..size])
    }

    pub fn consistency_proof(&self, old_size: usize, new_size: usize) -> Vec<Hash> {
        if old_size == 0 || old_size == new_size {
            return Vec::new();
        }
        subproof(old_size, &self.leaves[..new_size], true)
    }

    pub fn checkpoint(&self, size: usize) -> Checkpoint {
        Checkpoint::new(ORIGIN, size as u64, self.root(size))
    }

    pub fn inclusion_response(&self, index: usize, size: usize) -> InclusionProofResponse {
        InclusionProofResponse {
            log_index: index as u64,
            tree_size: size as u64,
            root_hash: hex::encode(self.root(size)),
            hashes: self
                .inclusion_path(index, size)
                .iter()
                .map(hex::encode)
                .collect(),
            checkpoint: None,
        }
    }
}

fn split_point(n: usize) -> usize {
    n.next_power_of_two() / 2
}

pub fn mth(leaves: &[Hash]) -> Hash {
    match leaves.len() {
        0 => Rfc6962Hasher.empty_root(),
        1 => leaves[0],
        n => {
            let k = split_point(n);
            Rfc6962Hasher.hash_children(&mth(&leaves[..k]), &mth(&leaves[k..]))
        }
    }
}

fn path(index: usize, leaves: &[Hash]) -> Vec<Hash> {
    let n = leaves.len();
    if n <= 1 {
        return Vec::new();
    }
    let k = split_point(n);
    if index < k {
        let mut p = path(index, &leaves[..k]);
        p.push(mth(&leaves[k..]));
        p
    } else {
        let mut p = path(index - k, &leaves[k..]);
        p.push(mth(&leaves[..k]));
        p
    }
}

fn subproof(m: usize, leaves: &[Hash], complete: bool) -> Vec<Hash> {
    let n = leaves.len();
    if m == n {
        return if complete { Vec::new() } else { vec![mth(leaves)] };
    }
    let k = split_point(n);
    if m <= k {
        let mut p = subproof(m, &leaves[..k], complete);
        p.push(mth(&leaves[k..]));
        p
    } else {
        let mut p = subproof(m - k, &leaves[k..], false);
        p.push(mth(&leaves[..k]));
        p
    }
}

/// Deterministic secp256k1 log operator key.
pub struct Secp256k1Signer {
    secret_key: SecretKey,
}

impl Secp256k1Signer {
    pub fn new(seed: u8) -> Self {
        Self {
            secret_key: SecretKey::from_slice(&[seed; 32]).unwrap(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(&Secp256k1::new(), &self.secret_key)
    }

    pub fn verifier(&self) -> Arc<dyn SignatureVerifier> {
        Arc::new(Secp256k1Verifier::new(self.public_key()))
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest).unwrap();
        Secp256k1::new()
            .sign_ecdsa(&message, &self.secret_key)
            .serialize_der()
            .to_vec()
    }
}

/// Deterministic ed25519 log operator key.
pub struct Ed25519Signer {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    pub fn new(seed: u8) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    pub fn verifier(&self) -> Arc<dyn SignatureVerifier> {
        Arc::new(Ed25519Verifier::new(self.signing_key.verifying_key()))
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// Deterministic ECDSA P-256 log operator key, the scheme Rekor uses.
pub struct P256Signer {
    signing_key: p256::ecdsa::SigningKey,
}

impl P256Signer {
    pub fn new(seed: u8) -> Self {
        Self {
            signing_key: p256::ecdsa::SigningKey::from_slice(&[seed; 32]).unwrap(),
        }
    }

    pub fn public_key_pem(&self) -> String {
        use p256::pkcs8::{EncodePublicKey, LineEnding};

        p256::ecdsa::VerifyingKey::from(&self.signing_key)
            .to_public_key_pem(LineEnding::LF)
            .unwrap()
    }

    pub fn verifier(&self) -> Arc<dyn SignatureVerifier> {
        Arc::new(P256Verifier::new(p256::ecdsa::VerifyingKey::from(
            &self.signing_key,
        )))
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        use p256::ecdsa::signature::Signer as _;

        let signature: p256::ecdsa::Signature = self.signing_key.sign(message);
        signature.to_der().as_bytes().to_vec()
    }
}

/// Render a signed checkpoint note with one signature line.
pub fn signed_note(checkpoint: &Checkpoint, signature: &[u8]) -> String {
    let mut raw = vec![0x01, 0x02, 0x03, 0x04];
    raw.extend_from_slice(signature);
    format!(
        "{}\n\u{2014} {} {}\n",
        checkpoint.marshal(),
        "rekor.example.dev",
        STANDARD.encode(raw)
    )
}

pub fn sign_checkpoint(signer: &Ed25519Signer, checkpoint: &Checkpoint) -> SignedCheckpoint {
    let signature = signer.sign(checkpoint.marshal().as_bytes());
    parse_checkpoint(&signed_note(checkpoint, &signature)).unwrap()
}

/// Build a fully populated entry for `index` of `log` at `size`, with a
/// signed entry timestamp from `signer`.
pub fn signed_entry(log: &TestLog, index: usize, size: usize, signer: &Secp256k1Signer) -> LogEntry {
    signed_entry_with(log, index, size, |payload| signer.sign(payload))
}

/// [`signed_entry`] with an arbitrary timestamp signing function.
pub fn signed_entry_with<F>(log: &TestLog, index: usize, size: usize, sign: F) -> LogEntry
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    let mut entry = LogEntry {
        body: log.entries[index].clone(),
        integrated_time: Some(1_700_000_000 + index as i64),
        log_index: Some(index as u64),
        log_id: Some(LOG_ID.to_string()),
        verification: None,
    };
    let set = sign(&entry_timestamp_payload(&entry).unwrap());
    entry.verification = Some(EntryVerification {
        inclusion_proof: Some(log.inclusion_response(index, size)),
        signed_entry_timestamp: Some(set),
    });
    entry
}
