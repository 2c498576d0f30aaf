pub mod key_management;
pub mod signatures;

pub use key_management::{
    verifier_from_bytes, verifier_from_file, verifier_from_hex, verifier_from_pem, verifier_from_text,
    KeyType,
};
pub use signatures::{Ed25519Verifier, P256Verifier, Secp256k1Verifier, SignatureVerifier};
