use crate::error::VerificationError;
use ed25519_dalek::Verifier as _;
use p256::pkcs8::DecodePublicKey;
use secp256k1::{ecdsa::Signature, PublicKey, Secp256k1, VerifyOnly};
use sha2::{Digest, Sha256};

/// A public key that can check signatures made by a log operator.
///
/// `Ok(false)` means the signature does not verify. Errors are reserved for
/// inputs that cannot be checked at all.
pub trait SignatureVerifier: Send + Sync {
    fn verify_signature(&self, signature: &[u8], message: &[u8]) -> Result<bool, VerificationError>;
}

/// ECDSA over secp256k1 with SHA-256 message digests and DER signatures.
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
    public_key: PublicKey,
}

impl Secp256k1Verifier {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            secp: Secp256k1::verification_only(),
            public_key,
        }
    }

    /// Parse a compressed or uncompressed SEC1 encoded public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerificationError> {
        let public_key = PublicKey::from_slice(bytes)
            .map_err(|e| VerificationError::KeyError(format!("Invalid secp256k1 key: {}", e)))?;
        Ok(Self::new(public_key))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify_signature(&self, signature: &[u8], message: &[u8]) -> Result<bool, VerificationError> {
        if signature.is_empty() {
            return Err(VerificationError::MissingField("signature"));
        }

        let signature = match Signature::from_der(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };

        let message_hash = Sha256::digest(message);
        let message_hash = secp256k1::Message::from_digest_slice(&message_hash)
            .map_err(|e| VerificationError::EncodingError(format!("Invalid message hash: {}", e)))?;

        match self.secp.verify_ecdsa(&message_hash, &signature, &self.public_key) {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// Ed25519 over the raw message.
pub struct Ed25519Verifier {
    public_key: ed25519_dalek::VerifyingKey,
}

impl Ed25519Verifier {
    pub fn new(public_key: ed25519_dalek::VerifyingKey) -> Self {
        Self { public_key }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerificationError> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            VerificationError::KeyError(format!(
                "Invalid ed25519 key length: {} (expected 32)",
                bytes.len()
            ))
        })?;
        let public_key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|e| VerificationError::KeyError(format!("Invalid ed25519 key: {}", e)))?;
        Ok(Self::new(public_key))
    }

    /// Parse a PEM `PUBLIC KEY` block.
    pub fn from_pem(pem: &str) -> Result<Self, VerificationError> {
        use ed25519_dalek::pkcs8::DecodePublicKey as _;

        let public_key = ed25519_dalek::VerifyingKey::from_public_key_pem(pem.trim())
            .map_err(|e| VerificationError::KeyError(format!("Invalid ed25519 PEM key: {}", e)))?;
        Ok(Self::new(public_key))
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify_signature(&self, signature: &[u8], message: &[u8]) -> Result<bool, VerificationError> {
        if signature.is_empty() {
            return Err(VerificationError::MissingField("signature"));
        }

        let signature = match ed25519_dalek::Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };

        Ok(self.public_key.verify(message, &signature).is_ok())
    }
}

/// ECDSA over NIST P-256 with SHA-256 message digests and DER signatures.
/// This is the scheme Rekor signs entry timestamps and checkpoints with.
pub struct P256Verifier {
    public_key: p256::ecdsa::VerifyingKey,
}

impl P256Verifier {
    pub fn new(public_key: p256::ecdsa::VerifyingKey) -> Self {
        Self { public_key }
    }

    /// Parse a SEC1 encoded point or a DER `SubjectPublicKeyInfo`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerificationError> {
        if let Ok(public_key) = p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes) {
            return Ok(Self::new(public_key));
        }
        let public_key = p256::ecdsa::VerifyingKey::from_public_key_der(bytes)
            .map_err(|e| VerificationError::KeyError(format!("Invalid P-256 key: {}", e)))?;
        Ok(Self::new(public_key))
    }

    /// Parse a PEM `PUBLIC KEY` block.
    pub fn from_pem(pem: &str) -> Result<Self, VerificationError> {
        let public_key = p256::ecdsa::VerifyingKey::from_public_key_pem(pem.trim())
            .map_err(|e| VerificationError::KeyError(format!("Invalid P-256 PEM key: {}", e)))?;
        Ok(Self::new(public_key))
    }

    pub fn public_key(&self) -> &p256::ecdsa::VerifyingKey {
        &self.public_key
    }
}

impl SignatureVerifier for P256Verifier {
    fn verify_signature(&self, signature: &[u8], message: &[u8]) -> Result<bool, VerificationError> {
        use p256::ecdsa::signature::Verifier as _;

        if signature.is_empty() {
            return Err(VerificationError::MissingField("signature"));
        }

        let signature = match p256::ecdsa::Signature::from_der(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };

        Ok(self.public_key.verify(message, &signature).is_ok())
    }
}
