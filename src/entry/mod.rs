//! Log Entry Wire Models
//!
//! Serde models for the log's JSON responses. Only hex and base64 decoding
//! happens here; entry bodies are opaque bytes.

pub mod canonical;
pub mod timestamp;

pub use canonical::{canonicalize, canonicalize_json};
pub use timestamp::{entry_timestamp_payload, verify_entry_timestamp};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checkpoint::{parse_checkpoint, SignedCheckpoint};
use crate::error::{Result, VerificationError};
use crate::merkle::{
    decode_hash, decode_hashes, ConsistencyProof, Hash, InclusionProof, LogHasher,
    Rfc6962Hasher,
};

/// Length of an entry UUID in hex characters.
pub const UUID_HEX_LEN: usize = 64;
/// Length of a tree ID prefix in hex characters.
pub const TREE_ID_HEX_LEN: usize = 16;

/// One entry as returned by the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Entry body, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrated_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    #[serde(rename = "logID", default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<EntryVerification>,
}

impl LogEntry {
    pub fn inclusion_proof(&self) -> Option<&InclusionProofResponse> {
        self.verification
            .as_ref()
            .and_then(|v| v.inclusion_proof.as_ref())
    }

    pub fn signed_entry_timestamp(&self) -> Option<&[u8]> {
        self.verification
            .as_ref()
            .and_then(|v| v.signed_entry_timestamp.as_deref())
    }

    /// Leaf hash of the entry body under `hasher`.
    pub fn leaf_hash<H: LogHasher>(&self, hasher: &H) -> Hash {
        hasher.hash_leaf(&self.body)
    }

    /// The log's identifier for this entry: the hex RFC 6962 leaf hash.
    pub fn uuid(&self) -> String {
        hex::encode(self.leaf_hash(&Rfc6962Hasher))
    }
}

/// Proof material the log attaches to an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryVerification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion_proof: Option<InclusionProofResponse>,
    #[serde(
        default,
        with = "base64_bytes_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub signed_entry_timestamp: Option<Vec<u8>>,
}

/// Inclusion proof with hex encoded hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProofResponse {
    pub log_index: u64,
    pub tree_size: u64,
    pub root_hash: String,
    #[serde(default)]
    pub hashes: Vec<String>,
    /// Signed checkpoint for `tree_size`, when the log includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
}

impl InclusionProofResponse {
    pub fn decode(&self) -> Result<InclusionProof> {
        Ok(InclusionProof {
            log_index: self.log_index,
            tree_size: self.tree_size,
            audit_path: decode_hashes(&self.hashes)?,
            root_hash: decode_hash(&self.root_hash)?,
        })
    }

    /// Parse the attached checkpoint, if any.
    pub fn signed_checkpoint(&self) -> Option<Result<SignedCheckpoint>> {
        self.checkpoint.as_deref().map(parse_checkpoint)
    }
}

/// Consistency proof with hex encoded hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyProofResponse {
    #[serde(default)]
    pub hashes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_hash: Option<String>,
}

impl ConsistencyProofResponse {
    pub fn decode(&self, first_size: u64, last_size: u64) -> Result<ConsistencyProof> {
        Ok(ConsistencyProof {
            first_size,
            last_size,
            hashes: decode_hashes(&self.hashes)?,
        })
    }

    pub fn decoded_root_hash(&self) -> Result<Option<Hash>> {
        self.root_hash.as_deref().map(decode_hash).transpose()
    }
}

/// Parse an entry response: either a `{ "<uuid>": entry, ... }` map, a
/// single bare entry, or an array of either. Pairs come back in key order;
/// bare entries are keyed by their computed UUID.
pub fn parse_log_entries(json: &str) -> Result<Vec<(String, LogEntry)>> {
    let value: Value = serde_json::from_str(json)?;
    let mut entries = Vec::new();
    collect_entries(value, &mut entries)?;
    Ok(entries)
}

fn collect_entries(value: Value, entries: &mut Vec<(String, LogEntry)>) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_entries(item, entries)?;
            }
        }
        Value::Object(map) if map.contains_key("body") => {
            let entry: LogEntry = serde_json::from_value(Value::Object(map))?;
            entries.push((entry.uuid(), entry));
        }
        Value::Object(map) => {
            for (uuid, entry) in map {
                let entry: LogEntry = serde_json::from_value(entry)?;
                entries.push((uuid, entry));
            }
        }
        other => {
            return Err(VerificationError::EncodingError(format!(
                "expected a log entry object, got {}",
                json_kind(&other)
            )))
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Extract the entry UUID from an entry ID, which is either the 64 hex
/// character UUID itself or the UUID prefixed by a 16 hex character tree ID.
pub fn uuid_from_entry_id(id: &str) -> Result<&str> {
    if !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(VerificationError::EncodingError(format!(
            "entry ID is not hex: {}",
            id
        )));
    }
    match id.len() {
        UUID_HEX_LEN => Ok(id),
        n if n == TREE_ID_HEX_LEN + UUID_HEX_LEN => Ok(&id[TREE_ID_HEX_LEN..]),
        n => Err(VerificationError::EncodingError(format!(
            "entry ID has length {}, expected {} or {}",
            n,
            UUID_HEX_LEN,
            TREE_ID_HEX_LEN + UUID_HEX_LEN
        ))),
    }
}

/// Narrow parsed entries down to those matching an optional UUID or entry
/// ID and an optional log index. Keys come back as UUIDs.
pub fn select_entries<'a>(
    entries: &'a [(String, LogEntry)],
    uuid: Option<&str>,
    log_index: Option<u64>,
) -> Result<Vec<(&'a str, &'a LogEntry)>> {
    let wanted = uuid.map(uuid_from_entry_id).transpose()?;
    Ok(entries
        .iter()
        .map(|(key, entry)| (uuid_from_entry_id(key).unwrap_or(key.as_str()), entry))
        .filter(|(key, _)| wanted.map_or(true, |wanted| *key == wanted))
        .filter(|(_, entry)| log_index.map_or(true, |index| entry.log_index == Some(index)))
        .collect())
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod base64_bytes_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
