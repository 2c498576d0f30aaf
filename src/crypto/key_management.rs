//! Public Key Loading
//!
//! Builds a shared [`SignatureVerifier`] from a log operator's public key.
//! Keys are exchanged as hex text or as a PEM `PUBLIC KEY` block, either
//! inline or in a file.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::signatures::{Ed25519Verifier, P256Verifier, Secp256k1Verifier, SignatureVerifier};
use crate::error::VerificationError;

/// Signature schemes a log may sign with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Secp256k1,
    Ed25519,
    #[serde(rename = "ecdsa-p256")]
    EcdsaP256,
}

const PEM_PREFIX: &str = "-----BEGIN";

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Secp256k1 => "secp256k1",
            KeyType::Ed25519 => "ed25519",
            KeyType::EcdsaP256 => "ecdsa-p256",
        }
    }
}

impl std::str::FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secp256k1" => Ok(KeyType::Secp256k1),
            "ed25519" => Ok(KeyType::Ed25519),
            "ecdsa-p256" => Ok(KeyType::EcdsaP256),
            _ => Err(format!("Unknown key type: {}", s)),
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a verifier from raw public key bytes. P-256 keys may be a SEC1
/// point or a DER `SubjectPublicKeyInfo`.
pub fn verifier_from_bytes(
    key_type: KeyType,
    bytes: &[u8],
) -> Result<Arc<dyn SignatureVerifier>, VerificationError> {
    let verifier: Arc<dyn SignatureVerifier> = match key_type {
        KeyType::Secp256k1 => Arc::new(Secp256k1Verifier::from_bytes(bytes)?),
        KeyType::Ed25519 => Arc::new(Ed25519Verifier::from_bytes(bytes)?),
        KeyType::EcdsaP256 => Arc::new(P256Verifier::from_bytes(bytes)?),
    };
    Ok(verifier)
}

/// Build a verifier from a hex encoded public key.
pub fn verifier_from_hex(
    key_type: KeyType,
    public_key: &str,
) -> Result<Arc<dyn SignatureVerifier>, VerificationError> {
    let bytes = hex::decode(public_key.trim())
        .map_err(|e| VerificationError::KeyError(format!("Invalid public key hex: {}", e)))?;
    verifier_from_bytes(key_type, &bytes)
}

/// Build a verifier from a PEM encoded public key.
pub fn verifier_from_pem(
    key_type: KeyType,
    pem: &str,
) -> Result<Arc<dyn SignatureVerifier>, VerificationError> {
    let verifier: Arc<dyn SignatureVerifier> = match key_type {
        KeyType::EcdsaP256 => Arc::new(P256Verifier::from_pem(pem)?),
        KeyType::Ed25519 => Arc::new(Ed25519Verifier::from_pem(pem)?),
        KeyType::Secp256k1 => {
            return Err(VerificationError::KeyError(
                "PEM keys are not supported for secp256k1, use hex".to_string(),
            ))
        }
    };
    Ok(verifier)
}

/// Build a verifier from key text, PEM if it starts with a PEM header and
/// hex otherwise.
pub fn verifier_from_text(
    key_type: KeyType,
    text: &str,
) -> Result<Arc<dyn SignatureVerifier>, VerificationError> {
    if text.trim_start().starts_with(PEM_PREFIX) {
        verifier_from_pem(key_type, text)
    } else {
        verifier_from_hex(key_type, text)
    }
}

/// Build a verifier from a file holding a PEM or hex encoded public key.
pub fn verifier_from_file(
    key_type: KeyType,
    path: &Path,
) -> Result<Arc<dyn SignatureVerifier>, VerificationError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        VerificationError::KeyError(format!("Failed to read {:?}: {}", path, e))
    })?;

    info!("Loaded {} public key from {:?}", key_type, path);
    verifier_from_text(key_type, &contents)
}
