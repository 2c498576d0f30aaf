//! Signed Checkpoints
//!
//! A checkpoint is a log's signed statement of its current size and root
//! hash, encoded as a signed note:
//!
//! ```text
//! <origin>
//! <tree size>
//! <base64 root hash>
//! [extension lines]
//!
//! — <signer name> <base64(key hint || signature)>
//! ```
//!
//! The signature covers the note text above the blank line, byte for byte.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

use crate::crypto::SignatureVerifier;
use crate::error::{Result, VerificationError};
use crate::merkle::{Hash, HASH_SIZE};

const SIGNATURE_LINE_PREFIX: &str = "\u{2014} ";
const KEY_HINT_SIZE: usize = 4;

/// The unsigned body of a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub origin: String,
    pub size: u64,
    pub hash: Hash,
    pub other_content: Vec<String>,
}

impl Checkpoint {
    pub fn new(origin: impl Into<String>, size: u64, hash: Hash) -> Self {
        Self {
            origin: origin.into(),
            size,
            hash,
            other_content: Vec::new(),
        }
    }

    /// Canonical text encoding; this is the exact payload a log signs.
    pub fn marshal(&self) -> String {
        let mut out = format!("{}\n{}\n{}\n", self.origin, self.size, STANDARD.encode(self.hash));
        for line in &self.other_content {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Parse a checkpoint body. Only canonical encodings are accepted, so
    /// `marshal` always reproduces the input.
    pub fn unmarshal(body: &str) -> Result<Self> {
        let body = body.strip_suffix('\n').ok_or_else(|| {
            VerificationError::ParseError("checkpoint body must end with a newline".to_string())
        })?;

        let lines: Vec<&str> = body.split('\n').collect();
        if lines.len() < 3 {
            return Err(VerificationError::ParseError(format!(
                "expected at least 3 lines, got {}",
                lines.len()
            )));
        }

        let origin = lines[0];
        if origin.is_empty() {
            return Err(VerificationError::ParseError("empty origin".to_string()));
        }

        let size = parse_size(lines[1])?;
        let hash = parse_root_hash(lines[2])?;

        let other_content: Vec<String> = lines[3..].iter().map(|l| l.to_string()).collect();
        if other_content.iter().any(|l| l.is_empty()) {
            return Err(VerificationError::ParseError("empty extension line".to_string()));
        }

        Ok(Self {
            origin: origin.to_string(),
            size,
            hash,
            other_content,
        })
    }
}

fn parse_size(line: &str) -> Result<u64> {
    let canonical = !line.is_empty()
        && line.bytes().all(|b| b.is_ascii_digit())
        && (line == "0" || !line.starts_with('0'));
    if !canonical {
        return Err(VerificationError::ParseError(format!(
            "malformed tree size: {:?}",
            line
        )));
    }

    line.parse::<u64>()
        .map_err(|e| VerificationError::ParseError(format!("malformed tree size {:?}: {}", line, e)))
}

fn parse_root_hash(line: &str) -> Result<Hash> {
    let bytes = STANDARD
        .decode(line)
        .map_err(|e| VerificationError::ParseError(format!("malformed root hash: {}", e)))?;

    if STANDARD.encode(&bytes) != line {
        return Err(VerificationError::ParseError(
            "root hash is not canonical base64".to_string(),
        ));
    }

    Hash::try_from(bytes.as_slice()).map_err(|_| {
        VerificationError::ParseError(format!(
            "root hash must be {} bytes, got {}",
            HASH_SIZE,
            bytes.len()
        ))
    })
}

/// One signature line of a signed note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSignature {
    pub name: String,
    pub key_hint: [u8; KEY_HINT_SIZE],
    pub signature: Vec<u8>,
}

impl NoteSignature {
    fn parse(line: &str) -> Result<Self> {
        let rest = line.strip_prefix(SIGNATURE_LINE_PREFIX).ok_or_else(|| {
            VerificationError::ParseError(format!("malformed signature line: {:?}", line))
        })?;

        let (name, encoded) = rest.split_once(' ').ok_or_else(|| {
            VerificationError::ParseError("signature line missing signature".to_string())
        })?;
        if name.is_empty() || encoded.contains(' ') {
            return Err(VerificationError::ParseError(format!(
                "malformed signature line: {:?}",
                line
            )));
        }

        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| VerificationError::ParseError(format!("malformed signature: {}", e)))?;
        if raw.len() <= KEY_HINT_SIZE {
            return Err(VerificationError::ParseError(format!(
                "signature too short: {} bytes",
                raw.len()
            )));
        }

        let mut key_hint = [0u8; KEY_HINT_SIZE];
        key_hint.copy_from_slice(&raw[..KEY_HINT_SIZE]);

        Ok(Self {
            name: name.to_string(),
            key_hint,
            signature: raw[KEY_HINT_SIZE..].to_vec(),
        })
    }

    pub fn marshal(&self) -> String {
        let mut raw = self.key_hint.to_vec();
        raw.extend_from_slice(&self.signature);
        format!("{}{} {}\n", SIGNATURE_LINE_PREFIX, self.name, STANDARD.encode(raw))
    }
}

/// A checkpoint together with its note signatures. None of the checkpoint
/// fields should be relied on until [`SignedCheckpoint::verify`] succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCheckpoint {
    pub checkpoint: Checkpoint,
    pub signatures: Vec<NoteSignature>,
}

impl SignedCheckpoint {
    pub fn new(checkpoint: Checkpoint, signatures: Vec<NoteSignature>) -> Self {
        Self {
            checkpoint,
            signatures,
        }
    }

    pub fn origin(&self) -> &str {
        &self.checkpoint.origin
    }

    pub fn size(&self) -> u64 {
        self.checkpoint.size
    }

    pub fn root_hash(&self) -> &Hash {
        &self.checkpoint.hash
    }

    /// Check the note signatures against `verifier`.
    ///
    /// Returns `Ok(true)` if any signature verifies over the re-derived
    /// checkpoint body and `Ok(false)` if none does.
    pub fn verify(&self, verifier: &dyn SignatureVerifier) -> Result<bool> {
        if self.signatures.is_empty() {
            return Err(VerificationError::MissingField("checkpoint signature"));
        }

        let payload = self.checkpoint.marshal();
        for signature in &self.signatures {
            if signature.signature.is_empty() {
                return Err(VerificationError::MissingField("checkpoint signature"));
            }
            if verifier.verify_signature(&signature.signature, payload.as_bytes())? {
                debug!(
                    "Checkpoint for {} verified with signature from {}",
                    self.checkpoint.origin, signature.name
                );
                return Ok(true);
            }
        }

        debug!(
            "None of {} signatures on checkpoint for {} verified",
            self.signatures.len(),
            self.checkpoint.origin
        );
        Ok(false)
    }

    pub fn marshal(&self) -> String {
        let mut out = self.checkpoint.marshal();
        out.push('\n');
        for signature in &self.signatures {
            out.push_str(&signature.marshal());
        }
        out
    }
}

impl FromStr for SignedCheckpoint {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self> {
        parse_checkpoint(s)
    }
}

impl fmt::Display for SignedCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marshal())
    }
}

/// Parse a signed checkpoint note.
pub fn parse_checkpoint(text: &str) -> Result<SignedCheckpoint> {
    let split = text
        .rfind("\n\n")
        .ok_or_else(|| VerificationError::ParseError("missing signature block".to_string()))?;

    let body = &text[..split + 1];
    let block = &text[split + 2..];
    if block.is_empty() {
        return Err(VerificationError::ParseError(
            "missing signature block".to_string(),
        ));
    }
    let block = block.strip_suffix('\n').ok_or_else(|| {
        VerificationError::ParseError("signature block must end with a newline".to_string())
    })?;

    let signatures = block
        .split('\n')
        .map(NoteSignature::parse)
        .collect::<Result<Vec<_>>>()?;
    let checkpoint = Checkpoint::unmarshal(body)?;

    Ok(SignedCheckpoint {
        checkpoint,
        signatures,
    })
}

/// Verify a checkpoint's signature, turning a rejection into
/// [`VerificationError::SignatureInvalid`].
pub fn verify_checkpoint_signature(
    checkpoint: &SignedCheckpoint,
    verifier: &dyn SignatureVerifier,
) -> Result<()> {
    if !checkpoint.verify(verifier)? {
        return Err(VerificationError::SignatureInvalid(format!(
            "no valid signature on checkpoint for {} at size {}",
            checkpoint.origin(),
            checkpoint.size()
        )));
    }

    info!(
        "Checkpoint signature verified: {} size {}",
        checkpoint.origin(),
        checkpoint.size()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Ed25519Verifier;
    use ed25519_dalek::{Signer as _, SigningKey};

    const ORIGIN: &str = "log.example.org - 1193050959916656506";

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn verifier(seed: u8) -> Ed25519Verifier {
        Ed25519Verifier::new(signing_key(seed).verifying_key())
    }

    fn sign(checkpoint: Checkpoint, key: &SigningKey, name: &str) -> SignedCheckpoint {
        let signature = key.sign(checkpoint.marshal().as_bytes()).to_bytes().to_vec();
        SignedCheckpoint::new(
            checkpoint,
            vec![NoteSignature {
                name: name.to_string(),
                key_hint: [0xde, 0xad, 0xbe, 0xef],
                signature,
            }],
        )
    }

    fn sample_checkpoint() -> Checkpoint {
        let mut checkpoint = Checkpoint::new(ORIGIN, 21428036, [0x5a; 32]);
        checkpoint
            .other_content
            .push("Timestamp: 1689748607742585419".to_string());
        checkpoint
    }

    #[test]
    fn test_marshal_format() {
        let checkpoint = Checkpoint::new("origin", 8, [0u8; 32]);
        assert_eq!(
            checkpoint.marshal(),
            "origin\n8\nAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=\n"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let signed = sign(sample_checkpoint(), &signing_key(1), "log.example.org");
        let text = signed.marshal();

        let parsed = parse_checkpoint(&text).unwrap();
        assert_eq!(parsed, signed);
        assert_eq!(parsed.marshal(), text);
        assert_eq!(parsed.size(), 21428036);
        assert_eq!(parsed.origin(), ORIGIN);
        assert_eq!(parsed.checkpoint.other_content, vec!["Timestamp: 1689748607742585419"]);
        assert_eq!(parsed.signatures[0].key_hint, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_parse_literal_note() {
        let text = format!(
            "{}\n3\n{}\n\n\u{2014} signer {}\n",
            ORIGIN,
            STANDARD.encode([9u8; 32]),
            STANDARD.encode([1u8, 2, 3, 4, 5, 6])
        );
        let parsed: SignedCheckpoint = text.parse().unwrap();
        assert_eq!(parsed.size(), 3);
        assert_eq!(parsed.root_hash(), &[9u8; 32]);
        assert_eq!(parsed.signatures[0].name, "signer");
        assert_eq!(parsed.signatures[0].key_hint, [1, 2, 3, 4]);
        assert_eq!(parsed.signatures[0].signature, vec![5, 6]);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn test_parse_missing_signature_block() {
        let body = sample_checkpoint().marshal();
        assert!(matches!(
            parse_checkpoint(&body),
            Err(VerificationError::ParseError(_))
        ));
        assert!(matches!(
            parse_checkpoint(&format!("{}\n", body)),
            Err(VerificationError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_malformed_size() {
        for size in ["-1", "ten", "", "007", "+5", "18446744073709551616"] {
            let text = format!(
                "{}\n{}\n{}\n\n\u{2014} signer {}\n",
                ORIGIN,
                size,
                STANDARD.encode([9u8; 32]),
                STANDARD.encode([1u8; 8])
            );
            assert!(
                matches!(parse_checkpoint(&text), Err(VerificationError::ParseError(_))),
                "size {:?} should be rejected",
                size
            );
        }
    }

    #[test]
    fn test_parse_malformed_hash() {
        for hash in [
            "not base64!".to_string(),
            STANDARD.encode([9u8; 31]),
            hex::encode([9u8; 32]),
        ] {
            let text = format!(
                "{}\n3\n{}\n\n\u{2014} signer {}\n",
                ORIGIN,
                hash,
                STANDARD.encode([1u8; 8])
            );
            assert!(matches!(
                parse_checkpoint(&text),
                Err(VerificationError::ParseError(_))
            ));
        }
    }

    #[test]
    fn test_parse_malformed_signature_lines() {
        let body = Checkpoint::new(ORIGIN, 3, [9u8; 32]).marshal();
        for line in [
            format!("- signer {}", STANDARD.encode([1u8; 8])),
            format!("\u{2014} {}", STANDARD.encode([1u8; 8])),
            format!("\u{2014} signer {} extra", STANDARD.encode([1u8; 8])),
            "\u{2014} signer !!!".to_string(),
            format!("\u{2014} signer {}", STANDARD.encode([1u8; 4])),
        ] {
            let text = format!("{}\n{}\n", body, line);
            assert!(
                matches!(parse_checkpoint(&text), Err(VerificationError::ParseError(_))),
                "line {:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_verify_signature() {
        let signed = sign(sample_checkpoint(), &signing_key(1), "log.example.org");
        assert!(signed.verify(&verifier(1)).unwrap());
        assert!(!signed.verify(&verifier(2)).unwrap());

        verify_checkpoint_signature(&signed, &verifier(1)).unwrap();
        assert!(matches!(
            verify_checkpoint_signature(&signed, &verifier(2)),
            Err(VerificationError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_verify_detects_tampered_fields() {
        let signed = sign(sample_checkpoint(), &signing_key(1), "log.example.org");

        let mut tampered = signed.clone();
        tampered.checkpoint.size += 1;
        assert!(!tampered.verify(&verifier(1)).unwrap());

        let mut tampered = signed.clone();
        tampered.checkpoint.hash[0] ^= 1;
        assert!(!tampered.verify(&verifier(1)).unwrap());

        let mut tampered = signed;
        tampered.checkpoint.other_content.clear();
        assert!(!tampered.verify(&verifier(1)).unwrap());
    }

    #[test]
    fn test_verify_any_of_several_signatures() {
        let checkpoint = sample_checkpoint();
        let other = sign(checkpoint.clone(), &signing_key(3), "witness");
        let mut signed = sign(checkpoint, &signing_key(1), "log.example.org");
        signed.signatures.insert(0, other.signatures[0].clone());

        let reparsed = parse_checkpoint(&signed.marshal()).unwrap();
        assert_eq!(reparsed.signatures.len(), 2);
        assert!(reparsed.verify(&verifier(1)).unwrap());
        assert!(reparsed.verify(&verifier(3)).unwrap());
        assert!(!reparsed.verify(&verifier(4)).unwrap());
    }

    #[test]
    fn test_verify_without_signatures_is_error() {
        let unsigned = SignedCheckpoint::new(sample_checkpoint(), Vec::new());
        assert!(matches!(
            unsigned.verify(&verifier(1)),
            Err(VerificationError::MissingField(_))
        ));
    }
}
