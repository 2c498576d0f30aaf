//! Signed Entry Timestamps
//!
//! The log signs the canonical JSON of an entry's body, integration time,
//! index and log ID when it accepts the entry.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use tracing::debug;

use super::canonical::canonicalize;
use super::LogEntry;
use crate::crypto::SignatureVerifier;
use crate::error::{Result, VerificationError};

/// Canonical bytes the log signed for `entry`.
pub fn entry_timestamp_payload(entry: &LogEntry) -> Result<Vec<u8>> {
    let integrated_time = entry
        .integrated_time
        .ok_or(VerificationError::MissingField("integratedTime"))?;
    let log_index = entry
        .log_index
        .ok_or(VerificationError::MissingField("logIndex"))?;
    let log_id = entry
        .log_id
        .as_deref()
        .ok_or(VerificationError::MissingField("logID"))?;

    let payload = json!({
        "body": STANDARD.encode(&entry.body),
        "integratedTime": integrated_time,
        "logIndex": log_index,
        "logID": log_id,
    });
    canonicalize(&payload)
}

/// Verify the signed entry timestamp attached to `entry`.
pub fn verify_entry_timestamp(entry: &LogEntry, verifier: &dyn SignatureVerifier) -> Result<()> {
    let signature = entry
        .signed_entry_timestamp()
        .filter(|set| !set.is_empty())
        .ok_or(VerificationError::MissingField("signedEntryTimestamp"))?;

    let payload = entry_timestamp_payload(entry)?;
    if !verifier.verify_signature(signature, &payload)? {
        return Err(VerificationError::SignatureInvalid(
            "signed entry timestamp does not verify".to_string(),
        ));
    }

    debug!(
        "Signed entry timestamp verified for index {:?}",
        entry.log_index
    );
    Ok(())
}
