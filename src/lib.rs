pub mod checkpoint;
pub mod config;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod merkle;
pub mod verify;

pub use checkpoint::{parse_checkpoint, verify_checkpoint_signature, Checkpoint, SignedCheckpoint};
pub use crypto::SignatureVerifier;
pub use entry::{verify_entry_timestamp, LogEntry};
pub use error::{Result, VerificationError};
pub use merkle::{Hash, InclusionProof, LogHasher, Rfc6962Hasher};
pub use verify::{verify_consistency, verify_inclusion, verify_log_entry, LogVerifier};
